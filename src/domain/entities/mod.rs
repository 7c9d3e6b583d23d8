//! Core domain entities.
//!
//! - [`RedirectRule`] - A stored redirect mapping scoped to a site
//! - [`Site`] - A host served by this process
//!
//! Creation and partial-update inputs are separate types (`NewRedirect`,
//! `RedirectPatch`, `NewSite`).

pub mod redirect;
pub mod site;

pub use redirect::{NewRedirect, RedirectPatch, RedirectRule, ResponseCode, UnknownResponseCode};
pub use site::{NewSite, Site, SiteId};
