//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET /health` - Health check: store and cache (never redirected)
//! - everything else - Redirect layer in front of the pages directory
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Redirects** - Rule lookup before or after page resolution

use crate::api::handlers::health_handler;
use crate::api::middleware::{redirect, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower_http::services::ServeDir;

/// Constructs the application router.
///
/// # Arguments
///
/// - `state` - shared application state
/// - `pages_dir` - directory whose files answer requests the redirect layer
///   lets through
pub fn app_router(state: AppState, pages_dir: &str) -> Router {
    let pages = Router::new().fallback_service(ServeDir::new(pages_dir));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .fallback_service(redirect_router(state, pages))
        .layer(tracing::layer())
}

/// Wraps `inner` with the redirect middleware.
///
/// `inner` stands for the site's normal routing: in the response phase its
/// status decides whether rules are consulted.
pub fn redirect_router(state: AppState, inner: Router) -> Router {
    inner.layer(middleware::from_fn_with_state(state, redirect::layer))
}
