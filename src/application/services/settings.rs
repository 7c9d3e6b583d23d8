//! Runtime redirect settings shared by the engine and the write path.

use arc_swap::ArcSwap;
use axum::http::StatusCode;
use std::str::FromStr;
use std::sync::Arc;

/// When the middleware consults the engine relative to normal routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPhase {
    /// Before routing; a match short-circuits the request.
    #[default]
    Request,
    /// After routing, based on the status the router produced.
    Response,
}

impl FromStr for RedirectPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(RedirectPhase::Request),
            "response" => Ok(RedirectPhase::Response),
            other => Err(format!(
                "REDIRECT_PHASE must be 'request' or 'response', got '{}'",
                other
            )),
        }
    }
}

/// Environment-level switches read on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSettings {
    /// Stored rule paths get a trailing slash (`APPEND_SLASH`).
    pub append_slash: bool,
    /// Exact rules may also match `path?query` (`REDIRECT_MATCH_QUERY`).
    pub match_query: bool,
    /// See [`RedirectPhase`] (`REDIRECT_PHASE`).
    pub phase: RedirectPhase,
    /// In the response phase, only consult rules for 404 responses
    /// (`REDIRECT_NOT_FOUND_ONLY`).
    pub not_found_only: bool,
    /// Turn unmatched failed responses into 410 (`REDIRECT_GONE_ON_NO_MATCH`).
    pub gone_on_no_match: bool,
    /// Restrict the 410 fallback to 404 responses
    /// (`REDIRECT_GONE_NOT_FOUND_ONLY`).
    pub gone_not_found_only: bool,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            append_slash: true,
            match_query: false,
            phase: RedirectPhase::Request,
            not_found_only: true,
            gone_on_no_match: false,
            gone_not_found_only: true,
        }
    }
}

impl RedirectSettings {
    /// Whether a response produced by routing should be checked against the rules.
    pub fn consults_response(&self, status: StatusCode) -> bool {
        status == StatusCode::NOT_FOUND || !self.not_found_only
    }

    /// Whether an unmatched request whose routed response has `status`
    /// should become 410 Gone.
    pub fn gone_for_unmatched(&self, status: StatusCode) -> bool {
        if !self.gone_on_no_match {
            return false;
        }

        if self.gone_not_found_only {
            status == StatusCode::NOT_FOUND
        } else {
            status.is_client_error() || status.is_server_error()
        }
    }
}

/// Settings handle shared between the engine, the write service and tests.
pub type SharedSettings = Arc<ArcSwap<RedirectSettings>>;

/// Wraps settings in a swappable shared handle.
pub fn shared_settings(settings: RedirectSettings) -> SharedSettings {
    Arc::new(ArcSwap::from_pointee(settings))
}
