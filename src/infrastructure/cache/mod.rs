//! Caching layer for redirect lookups.
//!
//! Provides a [`RedirectCache`] trait with three implementations:
//! - [`MemoryCache`] - In-process concurrent map (default)
//! - [`RedisCache`] - Redis-backed cache shared between processes
//! - [`NullCache`] - No-op implementation for disabled caching
//!
//! [`PgBroadcastCache`] and [`listen_for_invalidations`] carry invalidations
//! between processes that share a database.

mod broadcast;
mod memory_cache;
mod null_cache;
mod redis_cache;
mod service;

pub use broadcast::{INVALIDATION_CHANNEL, PgBroadcastCache, listen_for_invalidations};
pub use memory_cache::MemoryCache;
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheKey, CacheResult, RedirectCache};
