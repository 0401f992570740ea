//! Controller-specific error types.
//!
//! Errors raised by the reconcilers, the watch loops and process start-up
//! that are not covered by the client crate.

use kube::Error as KubeError;
use shortlink_client::ClientError;
use thiserror::Error;

/// Errors that can occur in the urlshortener controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Resource store error
    #[error("Store error: {0}")]
    Client(#[from] ClientError),

    /// Kubernetes client construction error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// HTTP server failed to bind or serve
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

impl ControllerError {
    /// Errors that will not go away by requeueing the same object
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Client(e) => !e.is_retryable(),
            Self::InvalidConfig(_) => true,
            Self::Kube(_) | Self::Watch(_) | Self::Server(_) => false,
        }
    }
}
