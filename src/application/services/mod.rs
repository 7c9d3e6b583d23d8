//! Business logic services for the application layer.

pub mod redirect_engine;
pub mod redirect_service;
pub mod settings;
pub mod site_resolver;

pub use redirect_engine::{RedirectEngine, RedirectRequest};
pub use redirect_service::RedirectService;
pub use settings::{RedirectPhase, RedirectSettings, SharedSettings, shared_settings};
pub use site_resolver::{HostSiteResolver, StaticSiteResolver};
