//! Request helpers.
//!
//! - [`extract_domain`] - Host extraction from HTTP requests

pub mod extract_domain;
