//! Bearer token authentication
//!
//! The API trusts an external identity provider: the token from the
//! `Authorization` header is exchanged for a login, and that login is the
//! user every Shortlink operation is authorized against.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::ApiState;
use super::error::ApiError;

const USER_AGENT: &str = concat!("urlshortener/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Caller as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub login: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Provider refused the token with this HTTP status
    #[error("identity provider rejected token with status {0}")]
    Rejected(u16),

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Resolves a bearer token to an identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identify(&self, token: &str) -> Result<Identity, IdentityError>;
}

/// Identity provider backed by the GitHub `/user` endpoint
#[derive(Debug, Clone)]
pub struct GitHubIdentityProvider {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubIdentityProvider {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GitHubIdentityProvider {
    async fn identify(&self, token: &str) -> Result<Identity, IdentityError> {
        let response = self
            .http
            .get(format!("{}/user", self.api_url))
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .header(header::AUTHORIZATION, format!("token {token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Rejected(status.as_u16()));
        }
        Ok(response.json::<Identity>().await?)
    }
}

/// Login of the authenticated caller, inserted by `require_identity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

/// Token from `Authorization: Bearer <token>` or `Authorization: token <token>`.
/// The scheme is matched case-insensitively.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    let known = scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token");
    (known && !token.is_empty()).then_some(token)
}

/// Middleware resolving the caller before any Shortlink API handler runs
pub async fn require_identity(State(state): State<ApiState>, mut request: Request, next: Next) -> Response {
    let user = match authenticate(&state.identity, request.headers()).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    debug!(user = %user.0, path = %request.uri().path(), "Authenticated request");
    request.extensions_mut().insert(user);
    next.run(request).await
}

async fn authenticate(provider: &Arc<dyn IdentityProvider>, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("missing or malformed Authorization header".to_string()))?;

    match provider.identify(token).await {
        Ok(identity) if !identity.login.is_empty() => Ok(CurrentUser(identity.login)),
        Ok(_) => Err(ApiError::Unauthorized("identity provider returned no login".to_string())),
        Err(IdentityError::Rejected(status)) => {
            warn!(status, "Bearer token rejected");
            Err(ApiError::Unauthorized("invalid bearer token".to_string()))
        }
        Err(err) => {
            warn!(error = %err, "Identity lookup failed");
            Err(ApiError::Internal(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(&headers("token abc")), Some("abc"));
        assert_eq!(extract_bearer_token(&headers("  Bearer   abc ")), Some("abc"));
    }

    #[test]
    fn test_extract_bearer_token_rejects_malformed() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
        assert_eq!(extract_bearer_token(&headers("Bearer")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer ")), None);
        assert_eq!(extract_bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer_token(&headers("abc")), None);
    }

    #[test]
    fn test_github_provider_trims_trailing_slash() {
        let provider = GitHubIdentityProvider::new("https://api.github.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(provider.api_url, "https://api.github.com");
    }
}
