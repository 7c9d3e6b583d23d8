//! Domain layer: entities, repository contracts and the matching core.
//!
//! - [`entities`] - Redirect rules and sites
//! - [`repositories`] - Storage trait definitions
//! - [`path`] - Path normalization for rules and requests
//! - [`resolver`] - Tiered matching over a site's rule snapshot
//! - [`outcome`] - Lookup outcomes and HTTP decisions
//! - [`site_resolver`] - Site identification contract
//!
//! Nothing in this layer performs I/O; the engine that combines it with the
//! cache and the store lives in [`crate::application::services`].

pub mod entities;
pub mod outcome;
pub mod path;
pub mod repositories;
pub mod resolver;
pub mod site_resolver;
