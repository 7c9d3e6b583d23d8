//! Site identification for incoming requests.

use crate::domain::entities::SiteId;
use crate::error::AppError;
use async_trait::async_trait;

/// Message surfaced when the engine runs without a site resolver.
pub const NO_SITE_MESSAGE: &str = "Redirect resolution requires site identification. \
     Set SITE_ID for a single-site deployment or SITE_FROM_HOST=true to resolve sites \
     from the Host header.";

/// Maps a request to the site whose rules apply to it.
///
/// # Implementations
///
/// - [`crate::application::services::StaticSiteResolver`] - One fixed site
/// - [`crate::application::services::HostSiteResolver`] - Host header lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteResolver: Send + Sync {
    /// Returns the site for a request host (port already stripped), or
    /// `None` when the host belongs to no known site.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the site lookup itself fails.
    async fn current_site(&self, host: &str) -> Result<Option<SiteId>, AppError>;
}
