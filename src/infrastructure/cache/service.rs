//! Cache trait, key type and error types.

use async_trait::async_trait;

use crate::domain::entities::SiteId;
use crate::domain::outcome::LookupOutcome;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache operation error: {0}")]
    Operation(String),

    #[error("Cache key of {length} bytes exceeds the backend limit of {limit}")]
    KeyTooLong { length: usize, limit: usize },

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Composite cache key: site, invalidation generation and normalized path.
///
/// Readers capture the generation before resolving. Once a site is
/// invalidated its generation moves on, so an entry written under the old
/// generation is unreachable even if the write lands after the invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub site: SiteId,
    pub generation: u64,
    pub path: String,
}

impl CacheKey {
    pub fn new(site: SiteId, generation: u64, path: impl Into<String>) -> Self {
        Self {
            site,
            generation,
            path: path.into(),
        }
    }

    /// Size of the key as a backend would see it.
    pub fn encoded_len(&self) -> usize {
        self.to_string().len()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "redirect:{}:{}:{}", self.site, self.generation, self.path)
    }
}

/// Rejects keys longer than `limit` bytes, if a limit is configured.
pub(crate) fn check_key_length(key: &CacheKey, limit: Option<usize>) -> CacheResult<()> {
    match limit {
        Some(limit) if key.encoded_len() > limit => Err(CacheError::KeyTooLong {
            length: key.encoded_len(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// Process-wide cache of lookup outcomes, partitioned by site.
///
/// # Contract
///
/// - `get` never blocks other readers
/// - `put` overwrites unconditionally; concurrent puts are last-write-wins
/// - `invalidate` drops every entry of a site and advances its generation;
///   it completes before the triggering write is acknowledged
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process concurrent map
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation
#[async_trait]
pub trait RedirectCache: Send + Sync {
    /// Current invalidation generation of a site (0 until first invalidated).
    async fn generation(&self, site: SiteId) -> CacheResult<u64>;

    /// Returns the cached outcome for a key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(outcome))` on cache hit
    /// - `Ok(None)` on cache miss
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<LookupOutcome>>;

    /// Stores an outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::KeyTooLong`] when the backend cannot hold the
    /// key. Callers skip caching and carry on.
    async fn put(&self, key: &CacheKey, outcome: &LookupOutcome) -> CacheResult<()>;

    /// Drops every cached outcome of a site.
    async fn invalidate(&self, site: SiteId) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;

    /// Backend name for logs and the health endpoint.
    fn name(&self) -> &'static str;
}
