//! ResourceStore trait for mocking
//!
//! Abstracts the namespaced Kubernetes API so clients and reconcilers can be
//! unit tested against an in-memory store.

use std::fmt::Debug;

use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Bounds every stored resource kind satisfies
pub trait StoreResource:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Kind name used in errors and logs
    fn kind_name() -> String {
        Self::kind(&()).into_owned()
    }
}

impl<K> StoreResource for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Namespaced resource store operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Dropping a returned future cancels the underlying request.
#[async_trait::async_trait]
pub trait ResourceStore<K: StoreResource>: Send + Sync {
    /// Namespace every call is scoped to
    fn namespace(&self) -> &str;

    /// Fetch one object by name
    async fn get(&self, name: &str) -> Result<K, ClientError>;

    /// List objects, optionally filtered by a `k=v,k2=v2` label selector
    async fn list(&self, label_selector: Option<&str>) -> Result<Vec<K>, ClientError>;

    /// Create a new object; the status portion is ignored
    async fn create(&self, obj: &K) -> Result<K, ClientError>;

    /// Replace an existing object; the status portion is ignored.
    /// A set `metadata.resourceVersion` must match the stored one.
    async fn update(&self, obj: &K) -> Result<K, ClientError>;

    /// Write only the status subresource.
    /// A set `metadata.resourceVersion` must match the stored one.
    async fn update_status(&self, obj: &K) -> Result<K, ClientError>;

    /// Delete an object by name
    async fn delete(&self, name: &str) -> Result<(), ClientError>;
}
