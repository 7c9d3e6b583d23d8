//! Lookup outcomes and the decisions the HTTP layer applies.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use super::entities::ResponseCode;

/// Status of a redirect outcome. Gone is a separate outcome, not a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectCode {
    Permanent,
    Temporary,
}

impl RedirectCode {
    pub fn status(&self) -> StatusCode {
        match self {
            RedirectCode::Permanent => StatusCode::MOVED_PERMANENTLY,
            RedirectCode::Temporary => StatusCode::FOUND,
        }
    }

    /// Maps a stored response code; `None` for [`ResponseCode::Gone`].
    pub fn from_response_code(code: ResponseCode) -> Option<Self> {
        match code {
            ResponseCode::Permanent => Some(RedirectCode::Permanent),
            ResponseCode::Temporary => Some(RedirectCode::Temporary),
            ResponseCode::Gone => None,
        }
    }
}

/// Result of resolving one normalized path against a site's rules.
///
/// Cached per (site, path), `NoMatch` included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LookupOutcome {
    Redirect {
        target: String,
        code: RedirectCode,
        /// The rule matched the path together with its query string, so the
        /// query is already accounted for and must not be appended again.
        #[serde(default)]
        query_matched: bool,
    },
    Gone,
    NoMatch,
}

impl LookupOutcome {
    pub fn redirect(target: impl Into<String>, code: RedirectCode) -> Self {
        LookupOutcome::Redirect {
            target: target.into(),
            code,
            query_matched: false,
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, LookupOutcome::NoMatch)
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            LookupOutcome::Redirect { .. } => "redirect",
            LookupOutcome::Gone => "gone",
            LookupOutcome::NoMatch => "no_match",
        }
    }

    /// Produces the response decision for a request carrying `query`.
    ///
    /// The request query is reattached to the target unless the rule matched
    /// on it or the target already has its own query.
    pub fn into_decision(self, query: Option<&str>) -> Decision {
        match self {
            LookupOutcome::Redirect {
                target,
                code,
                query_matched,
            } => {
                let location = match query {
                    Some(q) if !q.is_empty() && !query_matched && !target.contains('?') => {
                        format!("{}?{}", target, q)
                    }
                    _ => target,
                };
                Decision::Redirect {
                    location,
                    status: code.status(),
                }
            }
            LookupOutcome::Gone => Decision::Gone,
            LookupOutcome::NoMatch => Decision::Continue,
        }
    }
}

/// What the HTTP layer does with a request after the engine has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Redirect { location: String, status: StatusCode },
    Gone,
    Continue,
}
