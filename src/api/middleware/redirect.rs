//! Redirect middleware placed in front of normal routing.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::application::services::{RedirectPhase, RedirectRequest, RedirectSettings};
use crate::domain::outcome::Decision;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::extract_domain::extract_domain;

/// Applies redirect rules to every request passing through.
///
/// # Phases
///
/// - **request**: rules are checked before the inner router runs; a match
///   short-circuits with 301/302/410
/// - **response**: the inner router runs first and rules are only checked for
///   404 responses, or for every response when `not_found_only` is off
///
/// In both phases an unmatched request may have its failed response replaced
/// by 410 Gone, see [`RedirectSettings::gone_for_unmatched`].
///
/// # Errors
///
/// Configuration and storage errors from the engine become 500 responses.
/// They are never downgraded to a pass-through.
///
/// # Integration
///
/// ```rust,ignore
/// let app = Router::new()
///     .fallback_service(ServeDir::new("pages"))
///     .layer(middleware::from_fn_with_state(state, redirect::layer));
/// ```
pub async fn layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let settings = state.engine.settings();

    let host = extract_domain(request.headers(), request.uri()).unwrap_or_default();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);

    let redirect_request = RedirectRequest {
        host: &host,
        path: &path,
        query: query.as_deref(),
    };

    match settings.phase {
        RedirectPhase::Request => match state.engine.handle(&redirect_request).await? {
            Decision::Continue => {
                let response = next.run(request).await;
                Ok(gone_fallback(&settings, response))
            }
            decision => Ok(decision_response(decision)),
        },
        RedirectPhase::Response => {
            let response = next.run(request).await;

            if !settings.consults_response(response.status()) {
                return Ok(response);
            }

            match state.engine.handle(&redirect_request).await? {
                Decision::Continue => Ok(gone_fallback(&settings, response)),
                decision => Ok(decision_response(decision)),
            }
        }
    }
}

fn gone_fallback(settings: &RedirectSettings, response: Response) -> Response {
    if settings.gone_for_unmatched(response.status()) {
        StatusCode::GONE.into_response()
    } else {
        response
    }
}

fn decision_response(decision: Decision) -> Response {
    match decision {
        Decision::Redirect { location, status } => {
            match HeaderValue::from_str(&encode_location(&location)) {
                Ok(value) => Response::builder()
                    .status(status)
                    .header(header::LOCATION, value)
                    .body(Body::empty())
                    .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
                Err(e) => {
                    tracing::error!(location = %location, error = %e, "Unusable redirect target");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Decision::Gone => StatusCode::GONE.into_response(),
        Decision::Continue => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Percent-encodes characters a `Location` header cannot carry verbatim.
///
/// Existing escapes and reserved characters are left alone. A `%` that does
/// not start an escape becomes `%25`.
fn encode_location(location: &str) -> String {
    let mut encoded = String::with_capacity(location.len());

    for (i, c) in location.char_indices() {
        if c == '%' && !starts_escape(&location[i..]) {
            encoded.push_str("%25");
        } else if c.is_ascii_graphic()
            && !matches!(c, '"' | '<' | '>' | '\\' | '^' | '`' | '{' | '|' | '}')
        {
            encoded.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }

    encoded
}

fn starts_escape(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 3 && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}
