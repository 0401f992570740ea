//! urlshortener CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the urlshortener controller
//! and API server.

pub mod code;
pub mod error;
pub mod ownership;
pub mod redirect;
pub mod shortlink;
pub mod target;

pub use code::*;
pub use error::*;
pub use ownership::*;
pub use redirect::*;
pub use shortlink::*;
pub use target::*;

/// API group shared by all urlshortener resources
pub const API_GROUP: &str = "urlshortener.cedi.dev";

/// API version shared by all urlshortener resources
pub const API_VERSION: &str = "v1alpha1";
