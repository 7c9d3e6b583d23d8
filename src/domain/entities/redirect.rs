//! Redirect rule entity and its response codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::site::SiteId;

/// HTTP response a rule produces when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResponseCode {
    /// 301 Moved Permanently.
    #[default]
    #[serde(rename = "301")]
    Permanent,
    /// 302 Found.
    #[serde(rename = "302")]
    Temporary,
    /// 410 Gone.
    #[serde(rename = "410")]
    Gone,
}

impl ResponseCode {
    /// Returns the persisted text representation (`"301"`, `"302"` or `"410"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::Permanent => "301",
            ResponseCode::Temporary => "302",
            ResponseCode::Gone => "410",
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ResponseCode::Permanent => 301,
            ResponseCode::Temporary => 302,
            ResponseCode::Gone => 410,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown response code.
#[derive(Debug, thiserror::Error)]
#[error("Unsupported response code '{0}', expected one of 301, 302, 410")]
pub struct UnknownResponseCode(pub String);

impl FromStr for ResponseCode {
    type Err = UnknownResponseCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "301" => Ok(ResponseCode::Permanent),
            "302" => Ok(ResponseCode::Temporary),
            "410" => Ok(ResponseCode::Gone),
            other => Err(UnknownResponseCode(other.to_string())),
        }
    }
}

/// A stored mapping from an old path to a new target, scoped to one site.
///
/// `old_path` is always stored in normalized form (see
/// [`crate::domain::path::normalize_rule_path`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    pub id: i64,
    pub site: SiteId,
    pub old_path: String,
    pub new_path: String,
    pub response_code: ResponseCode,
    /// Treat `old_path` as a literal prefix; the target ignores the remainder.
    pub catchall_redirect: bool,
    /// Treat `old_path` as a literal prefix; the remainder is appended to the target.
    pub subpath_match: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RedirectRule {
    /// Returns true if this rule matches by prefix rather than exactly.
    pub fn is_prefix_rule(&self) -> bool {
        self.catchall_redirect || self.subpath_match
    }

    /// Returns true if a match on this rule yields a 410 response.
    ///
    /// An empty destination is gone whatever code is stored.
    pub fn is_gone(&self) -> bool {
        self.response_code == ResponseCode::Gone || self.new_path.is_empty()
    }
}

impl fmt::Display for RedirectRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ---> {}", self.old_path, self.new_path)
    }
}

/// Input data for creating a new rule.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NewRedirect {
    pub site: SiteId,
    #[validate(length(min = 1, max = 200))]
    pub old_path: String,
    #[validate(length(max = 200))]
    pub new_path: String,
    pub response_code: ResponseCode,
    pub catchall_redirect: bool,
    pub subpath_match: bool,
}

impl NewRedirect {
    /// Creates a plain exact-match rule with the default response code.
    pub fn new(site: SiteId, old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            site,
            old_path: old_path.into(),
            new_path: new_path.into(),
            response_code: ResponseCode::default(),
            catchall_redirect: false,
            subpath_match: false,
        }
    }

    pub fn with_code(mut self, code: ResponseCode) -> Self {
        self.response_code = code;
        self
    }

    pub fn catchall(mut self) -> Self {
        self.catchall_redirect = true;
        self
    }

    pub fn subpath(mut self) -> Self {
        self.subpath_match = true;
        self
    }

    pub fn is_prefix_rule(&self) -> bool {
        self.catchall_redirect || self.subpath_match
    }
}

/// Partial update for an existing rule.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct RedirectPatch {
    #[validate(length(min = 1, max = 200))]
    pub old_path: Option<String>,
    #[validate(length(max = 200))]
    pub new_path: Option<String>,
    pub response_code: Option<ResponseCode>,
    pub catchall_redirect: Option<bool>,
    pub subpath_match: Option<bool>,
}

impl RedirectPatch {
    pub fn is_empty(&self) -> bool {
        self.old_path.is_none()
            && self.new_path.is_none()
            && self.response_code.is_none()
            && self.catchall_redirect.is_none()
            && self.subpath_match.is_none()
    }
}
