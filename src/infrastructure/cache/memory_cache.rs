//! In-process cache backed by a sharded concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use super::service::{CacheKey, CacheResult, RedirectCache, check_key_length};
use crate::domain::entities::SiteId;
use crate::domain::outcome::LookupOutcome;

struct Entry {
    outcome: LookupOutcome,
    stored_at: Instant,
}

/// Lock-sharded in-memory cache shared by all request tasks.
///
/// Reads take a shard read lock only, so they never wait on other reads.
/// Entries live until their site is invalidated, their TTL runs out, or
/// they are evicted to stay within `max_entries`.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, Entry>,
    generations: DashMap<SiteId, u64>,
    max_key_length: Option<usize>,
    max_entries: Option<usize>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    /// Creates an unbounded cache without expiry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses keys longer than `limit` bytes.
    pub fn with_max_key_length(mut self, limit: usize) -> Self {
        self.max_key_length = Some(limit);
        self
    }

    /// Keeps at most `limit` entries across all sites.
    pub fn with_max_entries(mut self, limit: usize) -> Self {
        self.max_entries = Some(limit);
        self
    }

    /// Drops entries older than `ttl` on read.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Number of stored entries across all sites.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn current_generation(&self, site: SiteId) -> u64 {
        self.generations.get(&site).map(|g| *g).unwrap_or(0)
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.duration_since(entry.stored_at) >= ttl)
    }

    /// Makes room for one more entry. Expired and superseded entries go
    /// first; if that frees nothing, an arbitrary entry is dropped.
    fn make_room(&self, limit: usize) {
        if self.entries.len() < limit {
            return;
        }

        let now = Instant::now();
        self.entries.retain(|key, entry| {
            !self.is_expired(entry, now) && key.generation == self.current_generation(key.site)
        });

        while self.entries.len() >= limit {
            let victim = self.entries.iter().next().map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    debug!("Cache EVICT: {}", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl RedirectCache for MemoryCache {
    async fn generation(&self, site: SiteId) -> CacheResult<u64> {
        Ok(self.current_generation(site))
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<LookupOutcome>> {
        if key.generation != self.current_generation(key.site) {
            return Ok(None);
        }

        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !self.is_expired(&entry, now) => {
                return Ok(Some(entry.outcome.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(key, |_, entry| self.is_expired(entry, now));
        }
        Ok(None)
    }

    async fn put(&self, key: &CacheKey, outcome: &LookupOutcome) -> CacheResult<()> {
        check_key_length(key, self.max_key_length)?;

        if key.generation != self.current_generation(key.site) {
            debug!("Skipping cache write for superseded generation: {}", key);
            return Ok(());
        }

        if let Some(limit) = self.max_entries {
            self.make_room(limit);
        }

        self.entries.insert(
            key.clone(),
            Entry {
                outcome: outcome.clone(),
                stored_at: Instant::now(),
            },
        );

        // An invalidate may have run between the check and the insert.
        if key.generation != self.current_generation(key.site) {
            self.entries.remove(key);
        }

        Ok(())
    }

    async fn invalidate(&self, site: SiteId) -> CacheResult<()> {
        {
            let mut generation = self.generations.entry(site).or_insert(0);
            *generation += 1;
        }

        self.entries.retain(|key, _| key.site != site);
        debug!("Cache INVALIDATE: site {}", site);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
