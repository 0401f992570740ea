//! Public redirect endpoint `GET /{shortlink}`

use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use crds::{Shortlink, normalize_target};
use tracing::{debug, error, warn};

use super::ApiState;
use super::templates::{FALLBACK_ERROR_BODY, Pages};

/// Cache policy for resolved short links
pub const CACHE_CONTROL: &str = "public, max-age=900, stale-if-error=3600";

pub async fn handle_redirect(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let link = match state.public.get(&name).await {
        Ok(link) => link,
        Err(err) if err.is_not_found() => {
            debug!(name = %name, "Shortlink not found");
            state.metrics.record_redirect(StatusCode::NOT_FOUND.as_u16());
            return match state.pages.not_found(uri.path()) {
                Ok(page) => (StatusCode::NOT_FOUND, Html(page)).into_response(),
                Err(e) => internal_error(&state.pages, &e),
            };
        }
        Err(err) => {
            error!(name = %name, error = %err, "Failed to resolve Shortlink");
            state.metrics.record_redirect(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            return internal_error(&state.pages, &err);
        }
    };

    let response = redirect_response(&state.pages, &link, uri.path());
    state.metrics.record_redirect(response.status().as_u16());

    let public = state.public.clone();
    tokio::spawn(async move {
        if let Err(err) = public.increment_invocation_count(&name).await {
            warn!(name = %name, error = %err, "Failed to increment invocation count");
        }
    });

    response
}

/// 500 page, or a plain-text body when the page itself fails to render
fn internal_error(pages: &Pages, cause: &dyn std::fmt::Display) -> Response {
    match pages.internal_error() {
        Ok(page) => (StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response(),
        Err(e) => {
            error!(error = %e, cause = %cause, "Failed to render error page");
            (StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_ERROR_BODY).into_response()
        }
    }
}

/// Response for a resolved Shortlink: an HTML page for code 200, a protocol
/// level redirect to the normalized target otherwise
fn redirect_response(pages: &Pages, link: &Shortlink, request_path: &str) -> Response {
    let target = normalize_target(&link.spec.target);
    let code = link.spec.code;

    let mut response = if code.is_html_page() {
        match pages.redirect(request_path, &target, link.spec.redirect_after) {
            Ok(page) => Html(page).into_response(),
            Err(e) => {
                error!(target = %target, error = %e, "Failed to render redirect page");
                return internal_error(pages, &e);
            }
        }
    } else {
        let Ok(location) = HeaderValue::from_str(&target) else {
            error!(target = %target, "Shortlink target is not a valid Location header");
            return internal_error(pages, &"invalid Location header");
        };
        let status = StatusCode::from_u16(code.as_u16()).unwrap_or(StatusCode::TEMPORARY_REDIRECT);
        (status, [(header::LOCATION, location)]).into_response()
    };

    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    response
}
