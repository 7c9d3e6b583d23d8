//! Site entity. Every redirect rule belongs to exactly one site.

use chrono::{DateTime, Utc};

/// Identifier of a site.
pub type SiteId = i64;

/// A site served by this process, identified by its host name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: SiteId,
    pub domain: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Site {
    pub fn new(id: SiteId, domain: String, name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            domain,
            name,
            created_at,
        }
    }
}

/// Input data for creating a new site.
#[derive(Debug, Clone)]
pub struct NewSite {
    pub domain: String,
    pub name: String,
}
