//! Repository implementations.
//!
//! - [`PgRedirectRepository`] - Redirect rules in PostgreSQL
//! - [`PgSiteRepository`] - Sites in PostgreSQL
//! - [`MemoryRedirectRepository`] - Redirect rules in process memory

pub mod memory_redirect_repository;
pub mod pg_redirect_repository;
pub mod pg_site_repository;

pub use memory_redirect_repository::MemoryRedirectRepository;
pub use pg_redirect_repository::PgRedirectRepository;
pub use pg_site_repository::PgSiteRepository;
