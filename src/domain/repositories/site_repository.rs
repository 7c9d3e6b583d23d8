//! Repository trait for site lookup and management.

use crate::domain::entities::{NewSite, Site, SiteId};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for the sites that own redirect rules.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgSiteRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// Creates a new site.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if a site with the same domain exists.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_site: NewSite) -> Result<Site, AppError>;

    /// Finds a site by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_id(&self, id: SiteId) -> Result<Option<Site>, AppError>;

    /// Finds a site by its host name (case-insensitive, without port).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Site>, AppError>;

    /// Lists all sites ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list(&self) -> Result<Vec<Site>, AppError>;
}
