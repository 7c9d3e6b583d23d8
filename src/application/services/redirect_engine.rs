//! Per-request redirect resolution.

use std::sync::Arc;

use crate::application::services::settings::{RedirectSettings, SharedSettings};
use crate::domain::entities::SiteId;
use crate::domain::outcome::{Decision, LookupOutcome};
use crate::domain::path::normalize_path;
use crate::domain::repositories::RedirectRepository;
use crate::domain::resolver::MatchResolver;
use crate::domain::site_resolver::{NO_SITE_MESSAGE, SiteResolver};
use crate::error::AppError;
use crate::infrastructure::cache::{CacheError, CacheKey, RedirectCache};

/// The parts of an incoming request the engine looks at.
#[derive(Debug, Clone, Copy)]
pub struct RedirectRequest<'a> {
    /// Host without port.
    pub host: &'a str,
    /// Raw request path, possibly percent-encoded.
    pub path: &'a str,
    pub query: Option<&'a str>,
}

/// Resolves requests to redirect decisions with read-through caching.
///
/// # Flow
///
/// 1. Identify the site; unknown hosts pass through
/// 2. Normalize the path
/// 3. Look up the cached outcome for (site, path)
/// 4. On a miss, read the site's rules, resolve, and cache the outcome
///
/// Cache failures never fail a request: the engine falls back to the store.
/// Store failures always do.
pub struct RedirectEngine {
    repository: Arc<dyn RedirectRepository>,
    cache: Arc<dyn RedirectCache>,
    sites: Option<Arc<dyn SiteResolver>>,
    settings: SharedSettings,
}

impl RedirectEngine {
    pub fn new(
        repository: Arc<dyn RedirectRepository>,
        cache: Arc<dyn RedirectCache>,
        sites: Option<Arc<dyn SiteResolver>>,
        settings: SharedSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            sites,
            settings,
        }
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Arc<RedirectSettings> {
        self.settings.load_full()
    }

    /// Swaps the settings for subsequent requests.
    pub fn replace_settings(&self, settings: RedirectSettings) {
        self.settings.store(Arc::new(settings));
    }

    /// Decides what to do with a request.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] when no site resolver is installed.
    /// Returns [`AppError::Internal`] when the site lookup or the rule store
    /// fails.
    pub async fn handle(&self, request: &RedirectRequest<'_>) -> Result<Decision, AppError> {
        let sites = self
            .sites
            .as_ref()
            .ok_or_else(|| AppError::configuration(NO_SITE_MESSAGE))?;

        let Some(site) = sites.current_site(request.host).await? else {
            tracing::debug!(host = %request.host, "No site for host, passing through");
            return Ok(Decision::Continue);
        };

        let path = normalize_path(request.path, false);
        let outcome = self.lookup(site, &path, request.query).await?;

        metrics::counter!("redirect_outcomes_total", "outcome" => outcome.label()).increment(1);
        tracing::debug!(site, path = %path, outcome = outcome.label(), "Redirect lookup");

        Ok(outcome.into_decision(request.query))
    }

    /// Resolves a normalized path for a site, going through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the rule store cannot be read.
    pub async fn lookup(
        &self,
        site: SiteId,
        path: &str,
        query: Option<&str>,
    ) -> Result<LookupOutcome, AppError> {
        let match_query = self.settings.load().match_query;

        let generation = match self.cache.generation(site).await {
            Ok(generation) => generation,
            Err(e) => {
                tracing::warn!(site, error = %e, "Cache unavailable, reading rules directly");
                return self.resolve_uncached(site, path, query, match_query).await;
            }
        };

        let key = CacheKey::new(site, generation, cache_path(path, query, match_query));

        match self.cache.get(&key).await {
            Ok(Some(outcome)) => {
                metrics::counter!("redirect_cache_hits_total").increment(1);
                return Ok(outcome);
            }
            Ok(None) => {
                metrics::counter!("redirect_cache_misses_total").increment(1);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed");
            }
        }

        let outcome = self
            .resolve_uncached(site, path, query, match_query)
            .await?;

        match self.cache.put(&key, &outcome).await {
            Ok(()) => {}
            Err(CacheError::KeyTooLong { length, limit }) => {
                tracing::debug!(length, limit, "Cache key too long, outcome not cached");
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache write failed");
            }
        }

        Ok(outcome)
    }

    /// Resolves against a fresh snapshot of the site's rules.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the rule store cannot be read.
    pub async fn resolve_uncached(
        &self,
        site: SiteId,
        path: &str,
        query: Option<&str>,
        match_query: bool,
    ) -> Result<LookupOutcome, AppError> {
        let rules = self.repository.list_for_site(site).await?;
        Ok(MatchResolver::new(&rules).resolve(path, query, match_query))
    }
}

/// Path part of the cache key. The query only takes part in matching when
/// query rules are enabled, so only then does it split the key space.
///
/// `%` and `?` in the decoded path are escaped so a path that decoded from
/// `%3F` never shares a key with a real query string.
fn cache_path(path: &str, query: Option<&str>, match_query: bool) -> String {
    let path = path.replace('%', "%25").replace('?', "%3F");
    match query {
        Some(q) if match_query && !q.is_empty() => format!("{}?{}", path, q),
        _ => path,
    }
}
