//! Typed resource clients
//!
//! Thin wrappers over a `ResourceStore` for a single kind, scoped to the
//! store's namespace.

use std::sync::Arc;

use crds::{Redirect, Shortlink, ShortlinkStatus};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::store_trait::{ResourceStore, StoreResource};

/// Typed client for one resource kind in one namespace
pub struct TypedClient<K: StoreResource> {
    store: Arc<dyn ResourceStore<K>>,
}

/// Client for Shortlink resources
pub type ShortlinkClient = TypedClient<Shortlink>;
/// Client for Redirect resources
pub type RedirectClient = TypedClient<Redirect>;
/// Client for Ingress objects derived from Redirects
pub type IngressClient = TypedClient<Ingress>;

impl<K: StoreResource> Clone for TypedClient<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<K: StoreResource> std::fmt::Debug for TypedClient<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedClient")
            .field("kind", &K::kind_name())
            .field("namespace", &self.store.namespace())
            .finish()
    }
}

impl<K: StoreResource> TypedClient<K> {
    pub fn new(store: Arc<dyn ResourceStore<K>>) -> Self {
        Self { store }
    }

    pub fn namespace(&self) -> &str {
        self.store.namespace()
    }

    pub async fn get(&self, name: &str) -> Result<K, ClientError> {
        self.store.get(name).await
    }

    pub async fn list(&self) -> Result<Vec<K>, ClientError> {
        self.store.list(None).await
    }

    /// List objects carrying every label of `selector` (`k=v,k2=v2`)
    pub async fn list_by_labels(&self, selector: &str) -> Result<Vec<K>, ClientError> {
        self.store.list(Some(selector)).await
    }

    /// Create `obj`, defaulting its namespace to the client's namespace
    pub async fn create(&self, mut obj: K) -> Result<K, ClientError> {
        if obj.meta().namespace.is_none() {
            obj.meta_mut().namespace = Some(self.namespace().to_string());
        }
        let created = self.store.create(&obj).await?;
        info!(kind = %K::kind_name(), namespace = %self.namespace(), name = %created.name_any(), "Created");
        Ok(created)
    }

    pub async fn update(&self, obj: &K) -> Result<K, ClientError> {
        let updated = self.store.update(obj).await?;
        debug!(kind = %K::kind_name(), namespace = %self.namespace(), name = %updated.name_any(), "Updated");
        Ok(updated)
    }

    pub async fn update_status(&self, obj: &K) -> Result<K, ClientError> {
        let updated = self.store.update_status(obj).await?;
        debug!(kind = %K::kind_name(), namespace = %self.namespace(), name = %updated.name_any(), "Updated status");
        Ok(updated)
    }

    pub async fn delete(&self, name: &str) -> Result<(), ClientError> {
        self.store.delete(name).await?;
        info!(kind = %K::kind_name(), namespace = %self.namespace(), name = %name, "Deleted");
        Ok(())
    }
}

impl TypedClient<Shortlink> {
    /// Add one to `status.count` through the status subresource.
    ///
    /// Read-modify-write without retries: concurrent increments of the same
    /// Shortlink can lose updates or fail with a conflict.
    pub async fn increment_invocation_count(&self, name: &str) -> Result<Shortlink, ClientError> {
        let mut link = self.get(name).await?;
        let status = link.status.get_or_insert_with(ShortlinkStatus::default);
        status.count = status.count.saturating_add(1);
        self.update_status(&link).await
    }
}
