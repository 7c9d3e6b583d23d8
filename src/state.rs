use std::sync::Arc;

use crate::application::services::{RedirectEngine, RedirectService};
use crate::domain::repositories::RedirectRepository;
use crate::infrastructure::cache::RedirectCache;

/// Shared handles injected into middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RedirectEngine>,
    pub redirect_service: Arc<RedirectService>,
    pub repository: Arc<dyn RedirectRepository>,
    pub cache: Arc<dyn RedirectCache>,
}

impl AppState {
    pub fn new(
        engine: Arc<RedirectEngine>,
        redirect_service: Arc<RedirectService>,
        repository: Arc<dyn RedirectRepository>,
        cache: Arc<dyn RedirectCache>,
    ) -> Self {
        Self {
            engine,
            redirect_service,
            repository,
            cache,
        }
    }
}
