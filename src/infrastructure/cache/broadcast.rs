//! Cross-process invalidation over PostgreSQL `LISTEN`/`NOTIFY`.
//!
//! Writers wrap their cache in [`PgBroadcastCache`]; every invalidation is
//! then announced on [`INVALIDATION_CHANNEL`]. Servers holding a
//! process-local cache run [`listen_for_invalidations`] to apply those
//! announcements.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::service::{CacheError, CacheKey, CacheResult, RedirectCache};
use crate::domain::entities::SiteId;
use crate::domain::outcome::LookupOutcome;

/// Channel carrying the id of the site whose rules changed.
pub const INVALIDATION_CHANNEL: &str = "redirect_invalidate";

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Cache decorator that also notifies other processes on invalidation.
///
/// Reads and writes go straight to the inner cache.
pub struct PgBroadcastCache {
    inner: Arc<dyn RedirectCache>,
    pool: Arc<PgPool>,
}

impl PgBroadcastCache {
    pub fn new(inner: Arc<dyn RedirectCache>, pool: Arc<PgPool>) -> Self {
        Self { inner, pool }
    }
}

#[async_trait]
impl RedirectCache for PgBroadcastCache {
    async fn generation(&self, site: SiteId) -> CacheResult<u64> {
        self.inner.generation(site).await
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<LookupOutcome>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &CacheKey, outcome: &LookupOutcome) -> CacheResult<()> {
        self.inner.put(key, outcome).await
    }

    async fn invalidate(&self, site: SiteId) -> CacheResult<()> {
        self.inner.invalidate(site).await?;

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(INVALIDATION_CHANNEL)
            .bind(site.to_string())
            .execute(&*self.pool)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::debug!(site, "Invalidation broadcast");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Subscribes to [`INVALIDATION_CHANNEL`] and applies every notification to
/// `cache` until the returned task is aborted.
///
/// The subscription is in place when this returns. Notifications sent while
/// the connection is down are lost, so after reconnecting every site
/// in the database is invalidated.
///
/// # Errors
///
/// Returns an error if the initial subscription fails.
pub async fn listen_for_invalidations(
    pool: Arc<PgPool>,
    cache: Arc<dyn RedirectCache>,
) -> Result<JoinHandle<()>, sqlx::Error> {
    let mut listener = PgListener::connect_with(&pool).await?;
    listener.listen(INVALIDATION_CHANNEL).await?;
    tracing::info!(channel = INVALIDATION_CHANNEL, "Listening for cache invalidations");

    Ok(tokio::spawn(async move {
        loop {
            match listener.try_recv().await {
                Ok(Some(notification)) => match notification.payload().parse::<SiteId>() {
                    Ok(site) => invalidate(cache.as_ref(), site).await,
                    Err(_) => tracing::warn!(
                        payload = notification.payload(),
                        "Ignoring malformed invalidation notification"
                    ),
                },
                Ok(None) => {
                    tracing::warn!("Invalidation listener lost its connection");
                    resubscribe(&mut listener).await;
                    invalidate_all(&pool, cache.as_ref()).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Invalidation listener failed");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    resubscribe(&mut listener).await;
                    invalidate_all(&pool, cache.as_ref()).await;
                }
            }
        }
    }))
}

/// Retries until the listener is connected and subscribed again.
async fn resubscribe(listener: &mut PgListener) {
    while let Err(e) = listener.listen(INVALIDATION_CHANNEL).await {
        tracing::error!(error = %e, "Invalidation listener reconnect failed");
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
    tracing::info!("Invalidation listener reconnected");
}

async fn invalidate(cache: &dyn RedirectCache, site: SiteId) {
    match cache.invalidate(site).await {
        Ok(()) => tracing::debug!(site, "Applied remote invalidation"),
        Err(e) => tracing::error!(site, error = %e, "Remote invalidation failed"),
    }
}

async fn invalidate_all(pool: &PgPool, cache: &dyn RedirectCache) {
    let sites = match sqlx::query_scalar::<_, SiteId>("SELECT id FROM sites")
        .fetch_all(pool)
        .await
    {
        Ok(sites) => sites,
        Err(e) => {
            tracing::error!(error = %e, "Could not list sites to resync the cache");
            return;
        }
    };

    for site in sites {
        invalidate(cache, site).await;
    }
}
