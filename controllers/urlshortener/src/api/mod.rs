//! HTTP surface: public redirects and the authenticated Shortlink API

pub mod auth;
pub mod error;
pub mod handlers;
pub mod ops;
pub mod redirect;
pub mod templates;

#[cfg(test)]
mod api_test;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, header};
use axum::middleware;
use axum::routing::get;
use shortlink_client::{ShortlinkClient, UserShortlinkClient};
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::metrics::MetricsSink;
use auth::IdentityProvider;
use templates::Pages;

pub use auth::GitHubIdentityProvider;
pub use ops::{OpsState, ops_router};

const CONTENT_SECURITY_POLICY: &str = "default-src 'self' data: 'unsafe-inline'";

/// Shared state of every API handler
#[derive(Clone)]
pub struct ApiState {
    /// Ownership-scoped access for the CRUD API
    pub shortlinks: UserShortlinkClient,
    /// Unscoped access for the public redirect path
    pub public: ShortlinkClient,
    pub identity: Arc<dyn IdentityProvider>,
    pub metrics: Arc<dyn MetricsSink>,
    pub pages: Arc<Pages>,
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("shortlinks", &self.shortlinks)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Router serving `/{shortlink}` and `/api/v1/shortlink[/{shortlink}]`
pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route("/api/v1/shortlink", get(handlers::list_shortlinks))
        .route("/api/v1/shortlink/", get(handlers::list_shortlinks))
        .route(
            "/api/v1/shortlink/{shortlink}",
            get(handlers::get_shortlink)
                .post(handlers::create_shortlink)
                .put(handlers::update_shortlink)
                .delete(handlers::delete_shortlink),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_identity));

    Router::new()
        .route("/{shortlink}", get(redirect::handle_redirect))
        .merge(api)
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `addr` until `shutdown` resolves
pub async fn serve<F>(name: &str, addr: SocketAddr, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(server = %name, address = %addr, "HTTP server listening");
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;
    info!(server = %name, "HTTP server stopped");
    Ok(())
}
