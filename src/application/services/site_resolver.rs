//! Site resolver implementations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::entities::SiteId;
use crate::domain::repositories::SiteRepository;
use crate::domain::site_resolver::SiteResolver;
use crate::error::AppError;

/// Every request belongs to one configured site (`SITE_ID`).
#[derive(Debug, Clone, Copy)]
pub struct StaticSiteResolver {
    site: SiteId,
}

impl StaticSiteResolver {
    pub fn new(site: SiteId) -> Self {
        Self { site }
    }
}

#[async_trait]
impl SiteResolver for StaticSiteResolver {
    async fn current_site(&self, _host: &str) -> Result<Option<SiteId>, AppError> {
        Ok(Some(self.site))
    }
}

/// Resolves the site from the request host (`SITE_FROM_HOST`).
///
/// Known hosts are memoized for the life of the process. Unknown hosts fall
/// back to `fallback` when one is configured and are remembered for
/// [`UNKNOWN_HOST_TTL`], so a site added later is picked up after at most
/// that long.
pub struct HostSiteResolver {
    repository: Arc<dyn SiteRepository>,
    fallback: Option<SiteId>,
    known: DashMap<String, SiteId>,
    unknown: DashMap<String, Instant>,
    unknown_ttl: Duration,
}

/// How long a host with no site is remembered.
pub const UNKNOWN_HOST_TTL: Duration = Duration::from_secs(30);

/// Unknown hosts remembered at once. Host headers are client-controlled.
const MAX_UNKNOWN_HOSTS: usize = 1024;

impl HostSiteResolver {
    pub fn new(repository: Arc<dyn SiteRepository>, fallback: Option<SiteId>) -> Self {
        Self {
            repository,
            fallback,
            known: DashMap::new(),
            unknown: DashMap::new(),
            unknown_ttl: UNKNOWN_HOST_TTL,
        }
    }

    /// Overrides [`UNKNOWN_HOST_TTL`].
    pub fn with_unknown_host_ttl(mut self, ttl: Duration) -> Self {
        self.unknown_ttl = ttl;
        self
    }

    fn recently_unknown(&self, host: &str) -> bool {
        self.unknown
            .get(host)
            .is_some_and(|since| since.elapsed() < self.unknown_ttl)
    }

    fn remember_unknown(&self, host: String) {
        if self.unknown.len() >= MAX_UNKNOWN_HOSTS {
            self.unknown
                .retain(|_, since| since.elapsed() < self.unknown_ttl);
            if self.unknown.len() >= MAX_UNKNOWN_HOSTS {
                self.unknown.clear();
            }
        }
        self.unknown.insert(host, Instant::now());
    }
}

#[async_trait]
impl SiteResolver for HostSiteResolver {
    async fn current_site(&self, host: &str) -> Result<Option<SiteId>, AppError> {
        let host = host.to_ascii_lowercase();

        if let Some(site) = self.known.get(&host) {
            return Ok(Some(*site));
        }
        if self.recently_unknown(&host) {
            return Ok(self.fallback);
        }

        match self.repository.find_by_domain(&host).await? {
            Some(site) => {
                self.unknown.remove(&host);
                self.known.insert(host, site.id);
                Ok(Some(site.id))
            }
            None => {
                tracing::debug!(host = %host, "No site for host");
                self.remember_unknown(host);
                Ok(self.fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Site;
    use crate::domain::repositories::MockSiteRepository;
    use chrono::Utc;

    #[tokio::test]
    async fn test_static_resolver_ignores_host() {
        let resolver = StaticSiteResolver::new(3);
        assert_eq!(resolver.current_site("anything").await.unwrap(), Some(3));
        assert_eq!(resolver.current_site("").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_host_resolver_memoizes_known_hosts() {
        let mut repo = MockSiteRepository::new();
        repo.expect_find_by_domain()
            .withf(|domain| domain == "example.com")
            .times(1)
            .returning(|domain| {
                Ok(Some(Site::new(
                    5,
                    domain.to_string(),
                    "Example".to_string(),
                    Utc::now(),
                )))
            });

        let resolver = HostSiteResolver::new(Arc::new(repo), None);

        assert_eq!(resolver.current_site("Example.com").await.unwrap(), Some(5));
        assert_eq!(resolver.current_site("example.com").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_host_resolver_remembers_unknown_hosts() {
        let mut repo = MockSiteRepository::new();
        repo.expect_find_by_domain().times(1).returning(|_| Ok(None));

        let resolver = HostSiteResolver::new(Arc::new(repo), Some(1));

        for _ in 0..5 {
            assert_eq!(resolver.current_site("Nowhere.test").await.unwrap(), Some(1));
        }
    }

    #[tokio::test]
    async fn test_host_resolver_looks_unknown_host_up_again_after_ttl() {
        let mut repo = MockSiteRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_find_by_domain()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        repo.expect_find_by_domain()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|domain| {
                Ok(Some(Site::new(
                    9,
                    domain.to_string(),
                    "New".to_string(),
                    Utc::now(),
                )))
            });

        let resolver = HostSiteResolver::new(Arc::new(repo), None)
            .with_unknown_host_ttl(Duration::from_millis(20));

        assert_eq!(resolver.current_site("new.test").await.unwrap(), None);
        assert_eq!(resolver.current_site("new.test").await.unwrap(), None);

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(resolver.current_site("new.test").await.unwrap(), Some(9));
        assert_eq!(resolver.current_site("new.test").await.unwrap(), Some(9));
    }

    #[tokio::test]
    async fn test_host_resolver_bounds_unknown_hosts() {
        let mut repo = MockSiteRepository::new();
        repo.expect_find_by_domain().returning(|_| Ok(None));

        let resolver = HostSiteResolver::new(Arc::new(repo), None);

        for i in 0..(MAX_UNKNOWN_HOSTS * 2) {
            resolver.current_site(&format!("h{}.test", i)).await.unwrap();
        }

        assert!(resolver.unknown.len() <= MAX_UNKNOWN_HOSTS);
    }

    #[tokio::test]
    async fn test_host_resolver_falls_back() {
        let mut repo = MockSiteRepository::new();
        repo.expect_find_by_domain().returning(|_| Ok(None));

        let resolver = HostSiteResolver::new(Arc::new(repo), Some(1));

        assert_eq!(resolver.current_site("nowhere.test").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_host_resolver_propagates_store_errors() {
        let mut repo = MockSiteRepository::new();
        repo.expect_find_by_domain()
            .returning(|_| Err(AppError::internal("Database error", serde_json::json!({}))));

        let resolver = HostSiteResolver::new(Arc::new(repo), Some(1));
        let err = resolver.current_site("example.com").await.unwrap_err();

        assert!(matches!(err, AppError::Internal { .. }));
    }
}
