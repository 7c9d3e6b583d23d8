//! Repository trait for redirect rule storage.

use crate::domain::entities::{NewRedirect, RedirectPatch, RedirectRule, SiteId};
use crate::error::AppError;
use async_trait::async_trait;

/// Authoritative collection of redirect rules keyed by (site, old_path).
///
/// The engine only reads through [`RedirectRepository::list_for_site`]; writes
/// go through [`crate::application::services::RedirectService`] so that every
/// mutation invalidates the cache before it is acknowledged.
///
/// Implementations store `old_path` exactly as given. Normalization is the
/// service's job.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgRedirectRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryRedirectRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectRepository: Send + Sync {
    /// Creates a new rule.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the site already has a rule for `old_path`.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn create(&self, new_redirect: NewRedirect) -> Result<RedirectRule, AppError>;

    /// Finds a rule by its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_id(&self, id: i64) -> Result<Option<RedirectRule>, AppError>;

    /// Finds a rule by site and stored `old_path`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_old_path(
        &self,
        site: SiteId,
        old_path: &str,
    ) -> Result<Option<RedirectRule>, AppError>;

    /// Returns a snapshot of every rule of a site, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors. The engine propagates
    /// this as a failed request and never treats it as "no match".
    async fn list_for_site(&self, site: SiteId) -> Result<Vec<RedirectRule>, AppError>;

    /// Partially updates a rule. Only fields present in the patch change.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no rule has this id.
    /// Returns [`AppError::Conflict`] if the new `old_path` collides.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn update(&self, id: i64, patch: RedirectPatch) -> Result<RedirectRule, AppError>;

    /// Deletes a rule, returning it if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn delete(&self, id: i64) -> Result<Option<RedirectRule>, AppError>;

    /// Counts rules, optionally filtered by site.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn count(&self, site: Option<SiteId>) -> Result<i64, AppError>;
}
