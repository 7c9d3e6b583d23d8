//! Path canonicalization shared by rule storage and request lookup.
//!
//! Normalization percent-decodes once, so a rule stored as
//! `/path%20(escaped)/` and a request for `/path%20%28escaped%29/` meet on the
//! same key `/path (escaped)/`. A `%` that survives decoding and would start
//! another escape is written back as `%25`; this keeps the function
//! idempotent without decoding twice.

use std::borrow::Cow;
use tracing::debug;

/// Normalizes a raw request or rule path.
///
/// # Rules
///
/// 1. Percent-escapes are decoded exactly once
/// 2. Malformed escapes are kept literally; if the decoded bytes are not
///    UTF-8 the raw input is used unchanged
/// 3. The result starts with exactly one `/`
/// 4. With `append_slash`, a missing trailing `/` is added
///
/// # Examples
///
/// ```
/// use site_redirects::domain::path::normalize_path;
///
/// assert_eq!(normalize_path("path%20(escaped)/", false), "/path (escaped)/");
/// assert_eq!(normalize_path("/en/a", true), "/en/a/");
/// assert_eq!(normalize_path("/en/a", false), "/en/a");
/// ```
pub fn normalize_path(raw: &str, append_slash: bool) -> String {
    let decoded = decode_once(raw);
    let trimmed = decoded.trim_start_matches('/');

    let mut path = String::with_capacity(trimmed.len() + 2);
    path.push('/');
    path.push_str(trimmed);

    if append_slash && !path.ends_with('/') {
        path.push('/');
    }

    path
}

/// Normalizes the `old_path` of a rule before it is stored.
///
/// Prefix rules (catchall or subpath) keep their exact ending: a trailing
/// slash would change which request paths they cover. A query string on an
/// exact rule is kept verbatim after the normalized path.
pub fn normalize_rule_path(raw: &str, append_slash: bool, prefix_rule: bool) -> String {
    let append_slash = append_slash && !prefix_rule;

    match raw.split_once('?') {
        Some((path, query)) if !prefix_rule => {
            format!("{}?{}", normalize_path(path, append_slash), query)
        }
        _ => normalize_path(raw, append_slash),
    }
}

fn decode_once(raw: &str) -> Cow<'_, str> {
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }

    let bytes = urlencoding::decode_binary(raw.as_bytes());
    match String::from_utf8(bytes.into_owned()) {
        Ok(decoded) => Cow::Owned(escape_residual_percents(&decoded)),
        Err(_) => {
            debug!("Path {:?} does not decode to UTF-8, using it literally", raw);
            Cow::Borrowed(raw)
        }
    }
}

/// Rewrites every `%` that is followed by two hex digits as `%25`.
fn escape_residual_percents(decoded: &str) -> String {
    let bytes = decoded.as_bytes();
    let mut out = String::with_capacity(decoded.len());

    for (i, ch) in decoded.char_indices() {
        if ch == '%' && starts_escape(&bytes[i + 1..]) {
            out.push_str("%25");
        } else {
            out.push(ch);
        }
    }

    out
}

fn starts_escape(rest: &[u8]) -> bool {
    matches!(rest, [a, b, ..] if a.is_ascii_hexdigit() && b.is_ascii_hexdigit())
}
