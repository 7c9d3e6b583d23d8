//! HTTP server initialization and runtime setup.
//!
//! Builds the rule store, cache and site resolver from [`Config`], then runs
//! the Axum server until Ctrl+C.

use crate::application::services::{
    HostSiteResolver, RedirectEngine, RedirectService, StaticSiteResolver, shared_settings,
};
use crate::config::{CacheBackend, Config};
use crate::domain::repositories::{RedirectRepository, SiteRepository};
use crate::domain::site_resolver::SiteResolver;
use crate::infrastructure::cache::{
    MemoryCache, NullCache, PgBroadcastCache, RedirectCache, RedisCache, listen_for_invalidations,
};
use crate::infrastructure::persistence::{
    MemoryRedirectRepository, PgRedirectRepository, PgSiteRepository,
};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations (or the in-memory store)
/// - Redirect cache (memory, Redis or none), subscribed to invalidations
///   from other processes when it is process-local
/// - Site resolver
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The Redis backend is selected and unreachable
/// - Server bind fails
pub async fn run(config: Config) -> Result<()> {
    let pool = match &config.database_url {
        Some(url) => Some(connect_database(url, &config).await?),
        None => None,
    };

    let repository: Arc<dyn RedirectRepository> = match &pool {
        Some(pool) => Arc::new(PgRedirectRepository::new(pool.clone())),
        None => {
            tracing::warn!("No database configured, redirect rules are kept in memory");
            Arc::new(MemoryRedirectRepository::new())
        }
    };

    let cache = build_cache(&config).await?;

    let mut invalidation_listener = None;
    let writer_cache: Arc<dyn RedirectCache> = match &pool {
        Some(pool) => {
            if config.cache_backend == CacheBackend::Memory {
                let handle = listen_for_invalidations(pool.clone(), cache.clone())
                    .await
                    .context("Failed to subscribe to cache invalidations")?;
                invalidation_listener = Some(handle);
            }
            Arc::new(PgBroadcastCache::new(cache.clone(), pool.clone()))
        }
        None => cache.clone(),
    };

    let sites = build_site_resolver(&config, pool.as_ref());

    let settings = shared_settings(config.redirect.clone());
    let engine = Arc::new(RedirectEngine::new(
        repository.clone(),
        cache.clone(),
        sites,
        settings.clone(),
    ));
    let redirect_service = Arc::new(RedirectService::new(
        repository.clone(),
        writer_cache,
        settings,
    ));

    let state = AppState::new(engine, redirect_service, repository, cache);
    let app = app_router(state, &config.pages_dir);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = invalidation_listener {
        handle.abort();
    }
    if let Some(pool) = pool {
        pool.close().await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Opens the pool and applies pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn connect_database(url: &str, config: &Config) -> Result<Arc<PgPool>> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Some(Duration::from_secs(config.db_idle_timeout)))
        .max_lifetime(Some(Duration::from_secs(config.db_max_lifetime)))
        .connect(url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(Arc::new(pool))
}

/// Creates the configured cache backend.
///
/// # Errors
///
/// Returns an error if the Redis backend is selected and cannot be reached.
pub async fn build_cache(config: &Config) -> Result<Arc<dyn RedirectCache>> {
    let cache: Arc<dyn RedirectCache> = match (config.cache_backend, &config.redis_url) {
        (CacheBackend::Redis, Some(url)) => {
            let redis = RedisCache::connect(url, config.cache_ttl_seconds, config.cache_max_key_length)
                .await
                .context("Failed to connect to Redis")?;
            Arc::new(redis)
        }
        (CacheBackend::Redis, None) => anyhow::bail!("Redis cache selected without a Redis URL"),
        (CacheBackend::Memory, _) => Arc::new(memory_cache(config)),
        (CacheBackend::None, _) => Arc::new(NullCache::new()),
    };

    tracing::info!(backend = cache.name(), "Redirect cache ready");
    Ok(cache)
}

fn memory_cache(config: &Config) -> MemoryCache {
    let mut cache = MemoryCache::new().with_ttl(Duration::from_secs(config.cache_ttl_seconds));
    if let Some(limit) = config.cache_max_key_length {
        cache = cache.with_max_key_length(limit);
    }
    if let Some(limit) = config.cache_max_entries {
        cache = cache.with_max_entries(limit);
    }
    cache
}

fn build_site_resolver(
    config: &Config,
    pool: Option<&Arc<PgPool>>,
) -> Option<Arc<dyn SiteResolver>> {
    match (config.site_from_host, pool, config.site_id) {
        (true, Some(pool), fallback) => {
            let sites: Arc<dyn SiteRepository> = Arc::new(PgSiteRepository::new(pool.clone()));
            Some(Arc::new(HostSiteResolver::new(sites, fallback)))
        }
        (_, _, Some(site)) => Some(Arc::new(StaticSiteResolver::new(site))),
        _ => {
            tracing::warn!("No site configured, requests will fail until SITE_ID is set");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
