//! Ownership-scoped client
//!
//! Wraps a `TypedClient` and enforces an `Authorizer` on every operation.
//! The store itself has no notion of identity.

use chrono::Utc;
use crds::{OwnedResource, Shortlink};
use kube::ResourceExt;
use tracing::{debug, warn};

use crate::authorizer::{Authorizer, OwnerAuthorizer};
use crate::error::{ClientError, Operation};
use crate::store_trait::StoreResource;
use crate::typed::TypedClient;

/// Client acting on behalf of a single user per call
#[derive(Debug, Clone)]
pub struct ScopedClient<K: StoreResource, A = OwnerAuthorizer> {
    client: TypedClient<K>,
    authorizer: A,
}

/// Shortlink access limited to owners and co-owners
pub type UserShortlinkClient = ScopedClient<Shortlink, OwnerAuthorizer>;

impl<K, A> ScopedClient<K, A>
where
    K: StoreResource + OwnedResource,
    A: Authorizer<K>,
{
    pub fn new(client: TypedClient<K>, authorizer: A) -> Self {
        Self { client, authorizer }
    }

    fn authorize(&self, user: &str, operation: Operation, obj: &K) -> Result<(), ClientError> {
        if self.authorizer.is_allowed(user, obj) {
            return Ok(());
        }
        warn!(user = %user, operation = %operation, kind = %K::kind_name(), name = %obj.name_any(), "Access denied");
        Err(ClientError::not_allowed(user, operation, &K::kind_name(), &obj.name_any()))
    }

    /// Everything `user` may access. No match yields an empty list.
    pub async fn list(&self, user: &str) -> Result<Vec<K>, ClientError> {
        let owned: Vec<K> = self
            .client
            .list()
            .await?
            .into_iter()
            .filter(|obj| self.authorizer.is_allowed(user, obj))
            .collect();
        debug!(user = %user, kind = %K::kind_name(), count = owned.len(), "Listed owned objects");
        Ok(owned)
    }

    /// Fetch `name`. NotFound from the store is passed through unchanged.
    pub async fn get(&self, user: &str, name: &str) -> Result<K, ClientError> {
        let obj = self.client.get(name).await?;
        self.authorize(user, Operation::Read, &obj)?;
        Ok(obj)
    }

    /// Create `obj` owned by `user`, whatever owner it carried
    pub async fn create(&self, user: &str, mut obj: K) -> Result<K, ClientError> {
        obj.set_owner(user);
        self.client.create(obj).await
    }

    /// Replace the stored object with `obj`, then record `user` as last
    /// writer on the status subresource.
    ///
    /// The two writes are not atomic: if the status write fails the new spec
    /// stays in place and the error is returned.
    pub async fn update(&self, user: &str, mut obj: K) -> Result<K, ClientError> {
        let name = obj.name_any();
        let current = self.client.get(&name).await?;
        self.authorize(user, Operation::Update, &current)?;

        if obj.meta().resource_version.is_none() {
            obj.meta_mut().resource_version = current.resource_version();
        }
        let mut updated = self.client.update(&obj).await?;
        updated.record_change(user, Utc::now());
        self.client.update_status(&updated).await
    }

    /// Delete `name`, returning the object as it was before deletion
    pub async fn delete(&self, user: &str, name: &str) -> Result<K, ClientError> {
        let current = self.client.get(name).await?;
        self.authorize(user, Operation::Delete, &current)?;
        self.client.delete(name).await?;
        Ok(current)
    }
}
