//! Spec validation errors

use thiserror::Error;

/// Rejections raised while validating a Shortlink or Redirect spec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("redirect code {0} is not supported (allowed: 200, 300-305, 307, 308)")]
    InvalidCode(u16),

    #[error("redirect code {0} cannot be served by an ingress redirect")]
    UnsupportedRedirectCode(u16),

    #[error("target must not be empty")]
    EmptyTarget,

    #[error("target scheme '{0}' is not allowed, use http or https")]
    UnsupportedScheme(String),

    #[error("source must not be empty")]
    EmptySource,

    #[error("after must be between 0 and 99 seconds, got {0}")]
    RedirectAfterOutOfRange(u32),
}
