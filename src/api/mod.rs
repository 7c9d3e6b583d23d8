//! HTTP layer.
//!
//! # Modules
//!
//! - [`dto`] - Response bodies
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Redirect and tracing middleware

pub mod dto;
pub mod handlers;
pub mod middleware;
