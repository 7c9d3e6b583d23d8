//! Redis-backed cache implementation.

use super::service::{CacheError, CacheKey, CacheResult, RedirectCache, check_key_length};
use crate::domain::entities::SiteId;
use crate::domain::outcome::LookupOutcome;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

const SCAN_BATCH: usize = 500;

/// Redis cache shared by every process serving the same sites.
///
/// Keys are `redirect:{site}:{generation}:{path}` with JSON values. The
/// generation counter lives at `redirect:{site}:generation`; invalidation
/// increments it with `INCR` and then deletes the site's old keys. Reads and
/// writes are fail-open: errors are logged and treated as a miss or a
/// skipped write. Invalidation errors are returned to the writer.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: u64,
    max_key_length: Option<usize>,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and configures the default TTL.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `default_ttl_seconds` - TTL applied to cached outcomes (`CACHE_TTL_SECONDS`)
    /// - `max_key_length` - Keys above this size are not cached (`CACHE_MAX_KEY_LENGTH`)
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(
        redis_url: &str,
        default_ttl_seconds: u64,
        max_key_length: Option<usize>,
    ) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Connection(format!("Failed to create Redis client: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::Connection(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl: default_ttl_seconds,
            max_key_length,
        })
    }

    fn generation_key(site: SiteId) -> String {
        format!("redirect:{}:generation", site)
    }

    fn site_pattern(site: SiteId) -> String {
        format!("redirect:{}:[0-9]*:*", site)
    }
}

#[async_trait]
impl RedirectCache for RedisCache {
    async fn generation(&self, site: SiteId) -> CacheResult<u64> {
        let mut conn = self.client.clone();

        match conn.get::<_, Option<u64>>(Self::generation_key(site)).await {
            Ok(generation) => Ok(generation.unwrap_or(0)),
            Err(e) => Err(CacheError::Operation(format!(
                "Redis GET generation failed for site {}: {}",
                site, e
            ))),
        }
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<LookupOutcome>> {
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(key.to_string()).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(outcome) => {
                    debug!("Cache HIT: {}", key);
                    Ok(Some(outcome))
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, outcome: &LookupOutcome) -> CacheResult<()> {
        check_key_length(key, self.max_key_length)?;

        let value = serde_json::to_string(outcome)?;
        let mut conn = self.client.clone();

        match conn
            .set_ex::<_, _, ()>(key.to_string(), value, self.default_ttl)
            .await
        {
            Ok(_) => {
                debug!("Cache SET: {} (TTL: {}s)", key, self.default_ttl);
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", key, e);
                Ok(())
            }
        }
    }

    async fn invalidate(&self, site: SiteId) -> CacheResult<()> {
        let mut conn = self.client.clone();

        let generation: u64 = conn.incr(Self::generation_key(site), 1).await.map_err(|e| {
            CacheError::Operation(format!("Redis INCR failed for site {}: {}", site, e))
        })?;

        // Old generations are already unreachable; deleting them only frees memory.
        let mut stale: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let scanned: redis::RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(Self::site_pattern(site))
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;

            let (next, batch) = match scanned {
                Ok(page) => page,
                Err(e) => {
                    warn!("Redis SCAN interrupted for site {}: {}", site, e);
                    break;
                }
            };

            stale.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        if !stale.is_empty()
            && let Err(e) = conn.del::<_, i64>(&stale).await
        {
            warn!("Redis DEL error for site {}: {}", site, e);
        }

        debug!(
            "Cache INVALIDATE: site {} -> generation {} ({} keys dropped)",
            site,
            generation,
            stale.len()
        );
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
