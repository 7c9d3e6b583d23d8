//! HTTP middleware for request processing.
//!
//! Provides the redirect layer and request tracing.

pub mod redirect;
pub mod tracing;
