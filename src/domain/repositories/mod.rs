//! Repository trait definitions for the domain layer.
//!
//! Traits define the storage contract; implementations live in
//! `crate::infrastructure::persistence`. Mock implementations are generated
//! with `mockall` for unit tests.
//!
//! - [`RedirectRepository`] - Redirect rule storage scoped by site
//! - [`SiteRepository`] - Site lookup by host

pub mod redirect_repository;
pub mod site_repository;

pub use redirect_repository::RedirectRepository;
pub use site_repository::SiteRepository;

#[cfg(test)]
pub use redirect_repository::MockRedirectRepository;
#[cfg(test)]
pub use site_repository::MockSiteRepository;
