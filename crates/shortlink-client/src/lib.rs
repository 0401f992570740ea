//! urlshortener resource clients
//!
//! Typed access to namespaced urlshortener resources (Shortlink, Redirect)
//! and the Ingress objects derived from them.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use shortlink_client::{KubeStore, OwnerAuthorizer, ShortlinkClient, UserShortlinkClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeStore::new(client, "default", Duration::from_secs(10));
//! let shortlinks = ShortlinkClient::new(Arc::new(store));
//!
//! // Everything alice owns or co-owns
//! let scoped = UserShortlinkClient::new(shortlinks, OwnerAuthorizer);
//! let mine = scoped.list("alice").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - **Store**: `ResourceStore<K>`, implemented by `KubeStore` (Kubernetes API)
//!   and `MockStore` (in memory, `test-util` feature)
//! - **Typed client**: `TypedClient<K>`, namespace defaulting and tracing
//! - **Scoped client**: `ScopedClient<K, A>`, enforces an `Authorizer` policy

pub mod authorizer;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
#[path = "trait.rs"]
pub mod store_trait;
pub mod typed;
pub mod user;

pub use authorizer::{Authorizer, OwnerAuthorizer};
pub use client::KubeStore;
pub use error::{ClientError, Operation};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockOperation, MockStore};
pub use store_trait::{ResourceStore, StoreResource};
pub use typed::{IngressClient, RedirectClient, ShortlinkClient, TypedClient};
pub use user::{ScopedClient, UserShortlinkClient};
