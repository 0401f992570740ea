//! Resource client errors

use std::fmt;
use std::time::Duration;

use crds::SpecError;
use thiserror::Error;

/// Operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Errors that can occur when talking to the resource store
#[derive(Debug, Error)]
pub enum ClientError {
    /// Object does not exist in the store
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// Caller is neither owner nor co-owner
    #[error("Operation '{operation}' for user '{user}' is not allowed for {kind} '{name}'")]
    NotAllowed {
        user: String,
        operation: Operation,
        kind: String,
        name: String,
    },

    /// Optimistic concurrency failure or name collision
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Spec rejected before any store mutation
    #[error("Validation failed: {0}")]
    Validation(#[from] SpecError),

    /// Object cannot be sent to the store as-is
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Store call did not finish in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Store returned an error response
    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    /// Transport or client-side Kubernetes error
    #[error("Kubernetes client error: {0}")]
    Kube(#[source] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Classifies a kube error for the object `kind/name`
    pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ae) if ae.code == 409 => Self::Conflict(ae.message.clone()),
            kube::Error::Api(ae) => Self::Api {
                code: ae.code,
                message: ae.message.clone(),
            },
            other => Self::Kube(other),
        }
    }

    /// Shorthand for a missing object
    pub fn not_found(kind: &str, name: &str) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Shorthand for an authorization failure
    pub fn not_allowed(user: &str, operation: Operation, kind: &str, name: &str) -> Self {
        Self::NotAllowed {
            user: user.to_string(),
            operation,
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_not_allowed(&self) -> bool {
        matches!(self, Self::NotAllowed { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// True for transient store failures a work queue should retry.
    ///
    /// Missing objects, authorization failures and invalid input never
    /// become valid by retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict(_) | Self::Timeout(_) | Self::Kube(_) => true,
            Self::Api { code, .. } => *code >= 500 || *code == 429,
            Self::NotFound { .. }
            | Self::NotAllowed { .. }
            | Self::Validation(_)
            | Self::InvalidObject(_)
            | Self::Serialization(_) => false,
        }
    }
}
