//! Host extraction for site resolution.

use axum::http::{HeaderMap, Uri, header};

/// Extracts the lowercase host name a request was addressed to.
///
/// Reads the `Host` header, falling back to the authority of an
/// absolute-form URI (HTTP/2 `:authority`). Handles:
/// - IPv4 addresses (e.g., `192.168.1.1`)
/// - IPv6 addresses (e.g., `[::1]`)
/// - Hostnames with ports (e.g., `example.com:3000`)
///
/// Port numbers are stripped. Returns `None` when neither source carries a
/// usable host.
///
/// # Examples
///
/// ```ignore
/// let mut headers = HeaderMap::new();
/// headers.insert(header::HOST, "Example.com:8080".parse().unwrap());
///
/// let domain = extract_domain(&headers, &Uri::from_static("/"));
/// assert_eq!(domain.as_deref(), Some("example.com"));
/// ```
pub fn extract_domain(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))?;

    let domain = if host.starts_with('[') {
        match host.find(']') {
            Some(end_bracket) => &host[..=end_bracket],
            None => host,
        }
    } else {
        host.rsplit_once('@')
            .map_or(host, |(_, rest)| rest)
            .split(':')
            .next()
            .unwrap_or(host)
    };

    (!domain.is_empty()).then(|| domain.to_ascii_lowercase())
}
