//! No-op cache implementation for disabled caching.

use super::service::{CacheKey, CacheResult, RedirectCache};
use crate::domain::entities::SiteId;
use crate::domain::outcome::LookupOutcome;
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Every lookup misses, so every request resolves against the store.
///
/// # Use Cases
///
/// - `CACHE_BACKEND=none`
/// - Fallback when Redis connection fails at startup
/// - Tests that count store reads
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RedirectCache for NullCache {
    async fn generation(&self, _site: SiteId) -> CacheResult<u64> {
        Ok(0)
    }

    async fn get(&self, _key: &CacheKey) -> CacheResult<Option<LookupOutcome>> {
        Ok(None)
    }

    async fn put(&self, _key: &CacheKey, _outcome: &LookupOutcome) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _site: SiteId) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
