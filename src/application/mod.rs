//! Application layer services implementing business logic.
//!
//! Services consume the domain's repository and cache traits and are shared
//! by the HTTP middleware and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::redirect_engine::RedirectEngine`] - Per-request lookup with read-through caching
//! - [`services::redirect_service::RedirectService`] - Rule management and cache invalidation
//! - [`services::site_resolver`] - Mapping requests to sites

pub mod services;
