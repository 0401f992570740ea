//! HTTP error envelope
//!
//! Every failure leaves the API as `{"error": "...", "advice": "..."}` with
//! the status chosen by `ApiError::status_code`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use shortlink_client::ClientError;
use thiserror::Error;

/// Hint returned with every authentication failure
pub const BEARER_ADVICE: &str = "ensure you include a Bearer token in the Authorization header, e.g. Authorization: Bearer <token> or Authorization: token <token>";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable identity on the request
    #[error("{0}")]
    Unauthorized(String),

    /// Store or authorization failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Request body could not be decoded
    #[error("Failed to read ShortLink spec: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// NotAllowed and missing identity map to 401, NotFound to 404,
    /// everything else to 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Client(e) if e.is_not_allowed() => StatusCode::UNAUTHORIZED,
            Self::Client(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Client(_) | Self::InvalidBody(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn advice(&self) -> Option<String> {
        match self {
            Self::Unauthorized(_) => Some(BEARER_ADVICE.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            advice: self.advice(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
