//! Kubernetes-backed resource store
//!
//! Implements `ResourceStore` on top of a namespaced `kube::Api`. Every call
//! is bounded by a timeout and never retried here; retries belong to the
//! caller's work queue.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::ClientError;
use crate::store_trait::{ResourceStore, StoreResource};

/// Resource store backed by the Kubernetes API server
pub struct KubeStore<K: StoreResource> {
    api: Api<K>,
    namespace: String,
    timeout: Duration,
}

impl<K: StoreResource> KubeStore<K> {
    /// Create a store for `K` in `namespace`
    ///
    /// # Arguments
    /// * `client` - Kubernetes client
    /// * `namespace` - Namespace every call is scoped to
    /// * `timeout` - Upper bound for each API call
    pub fn new(client: Client, namespace: &str, timeout: Duration) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            timeout,
        }
    }

    /// Run one API call under the store timeout and classify its error
    async fn call<T, F>(&self, name: &str, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, kube::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ClientError::from_kube(e, &K::kind_name(), name)),
            Err(_elapsed) => Err(ClientError::Timeout(self.timeout)),
        }
    }
}

fn object_name<K: StoreResource>(obj: &K) -> Result<String, ClientError> {
    obj.meta()
        .name
        .clone()
        .ok_or_else(|| ClientError::InvalidObject(format!("{} without metadata.name", K::kind_name())))
}

/// Merge patch writing the status of `obj`, guarded by its resourceVersion
fn status_patch<K: StoreResource>(obj: &K) -> Result<Value, ClientError> {
    let status = serde_json::to_value(obj)?
        .get("status")
        .cloned()
        .unwrap_or(Value::Null);

    let mut metadata = Map::new();
    if let Some(rv) = obj.resource_version() {
        metadata.insert("resourceVersion".to_string(), Value::String(rv));
    }

    Ok(json!({
        "metadata": metadata,
        "status": status,
    }))
}

#[async_trait]
impl<K: StoreResource> ResourceStore<K> for KubeStore<K> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, name: &str) -> Result<K, ClientError> {
        debug!(kind = %K::kind_name(), namespace = %self.namespace, name = %name, "GET");
        self.call(name, self.api.get(name)).await
    }

    async fn list(&self, label_selector: Option<&str>) -> Result<Vec<K>, ClientError> {
        debug!(kind = %K::kind_name(), namespace = %self.namespace, selector = ?label_selector, "LIST");
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = self.call("", self.api.list(&params)).await?;
        Ok(list.items)
    }

    async fn create(&self, obj: &K) -> Result<K, ClientError> {
        let name = object_name(obj)?;
        debug!(kind = %K::kind_name(), namespace = %self.namespace, name = %name, "CREATE");
        self.call(&name, self.api.create(&PostParams::default(), obj)).await
    }

    async fn update(&self, obj: &K) -> Result<K, ClientError> {
        let name = object_name(obj)?;
        debug!(kind = %K::kind_name(), namespace = %self.namespace, name = %name, "REPLACE");
        self.call(&name, self.api.replace(&name, &PostParams::default(), obj)).await
    }

    async fn update_status(&self, obj: &K) -> Result<K, ClientError> {
        let name = object_name(obj)?;
        debug!(kind = %K::kind_name(), namespace = %self.namespace, name = %name, "PATCH status");
        let patch = status_patch(obj)?;
        self.call(
            &name,
            self.api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch)),
        )
        .await
    }

    async fn delete(&self, name: &str) -> Result<(), ClientError> {
        debug!(kind = %K::kind_name(), namespace = %self.namespace, name = %name, "DELETE");
        self.call(name, self.api.delete(name, &DeleteParams::default())).await?;
        Ok(())
    }
}
