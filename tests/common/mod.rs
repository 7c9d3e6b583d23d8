#![allow(dead_code)]

use axum::http::StatusCode;
use axum::{Router, routing::get};
use axum_test::TestServer;
use sqlx::PgPool;
use std::sync::Arc;
use site_redirects::application::services::{
    RedirectEngine, RedirectService, RedirectSettings, StaticSiteResolver, shared_settings,
};
use site_redirects::domain::entities::{NewRedirect, RedirectRule, SiteId};
use site_redirects::domain::repositories::RedirectRepository;
use site_redirects::domain::site_resolver::SiteResolver;
use site_redirects::infrastructure::cache::{MemoryCache, RedirectCache};
use site_redirects::infrastructure::persistence::{MemoryRedirectRepository, PgRedirectRepository};
use site_redirects::routes::redirect_router;
use site_redirects::state::AppState;

pub const SITE: SiteId = 1;

/// In-memory wiring with handles to the concrete store and cache.
pub struct TestApp {
    pub state: AppState,
    pub repository: Arc<MemoryRedirectRepository>,
    pub cache: Arc<MemoryCache>,
}

impl TestApp {
    pub fn new(settings: RedirectSettings) -> Self {
        Self::with_sites(settings, Some(Arc::new(StaticSiteResolver::new(SITE))))
    }

    pub fn with_sites(settings: RedirectSettings, sites: Option<Arc<dyn SiteResolver>>) -> Self {
        Self::build(settings, sites, MemoryCache::new())
    }

    pub fn with_cache(settings: RedirectSettings, cache: MemoryCache) -> Self {
        Self::build(settings, Some(Arc::new(StaticSiteResolver::new(SITE))), cache)
    }

    fn build(
        settings: RedirectSettings,
        sites: Option<Arc<dyn SiteResolver>>,
        cache: MemoryCache,
    ) -> Self {
        let repository = Arc::new(MemoryRedirectRepository::new());
        let cache = Arc::new(cache);
        let state = build_state(repository.clone(), cache.clone(), sites, settings);

        Self {
            state,
            repository,
            cache,
        }
    }

    pub fn engine(&self) -> &RedirectEngine {
        &self.state.engine
    }

    pub fn service(&self) -> &RedirectService {
        &self.state.redirect_service
    }

    pub async fn add(&self, new_redirect: NewRedirect) -> RedirectRule {
        self.service().create(new_redirect).await.unwrap()
    }

    /// Stores a rule as-is, bypassing validation and path cleaning.
    pub async fn add_raw(&self, new_redirect: NewRedirect) -> RedirectRule {
        self.repository.create(new_redirect).await.unwrap()
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(redirect_router(self.state.clone(), pages())).unwrap()
    }
}

pub fn build_state(
    repository: Arc<dyn RedirectRepository>,
    cache: Arc<dyn RedirectCache>,
    sites: Option<Arc<dyn SiteResolver>>,
    settings: RedirectSettings,
) -> AppState {
    let settings = shared_settings(settings);
    let engine = Arc::new(RedirectEngine::new(
        repository.clone(),
        cache.clone(),
        sites,
        settings.clone(),
    ));
    let service = Arc::new(RedirectService::new(
        repository.clone(),
        cache.clone(),
        settings,
    ));

    AppState::new(engine, service, repository, cache)
}

/// State backed by Postgres and an in-memory cache.
pub fn pg_state(pool: PgPool, settings: RedirectSettings) -> AppState {
    let repository: Arc<dyn RedirectRepository> =
        Arc::new(PgRedirectRepository::new(Arc::new(pool)));
    let sites: Arc<dyn SiteResolver> = Arc::new(StaticSiteResolver::new(SITE));

    build_state(repository, Arc::new(MemoryCache::new()), Some(sites), settings)
}

/// Stand-in for a site's own pages. Anything else is 404.
pub fn pages() -> Router {
    Router::new()
        .route("/en/", get(|| async { "home" }))
        .route("/en/test-page/", get(|| async { "test page" }))
        .route("/en/b/", get(|| async { "b" }))
        .route("/private/", get(|| async { StatusCode::FORBIDDEN }))
        .fallback(|| async { StatusCode::NOT_FOUND })
}

pub fn no_append_slash() -> RedirectSettings {
    RedirectSettings {
        append_slash: false,
        ..Default::default()
    }
}

pub async fn create_test_site(pool: &PgPool, domain: &str) -> SiteId {
    sqlx::query_scalar("INSERT INTO sites (domain, name) VALUES ($1, $1) RETURNING id")
        .bind(domain)
        .fetch_one(pool)
        .await
        .unwrap()
}
