//! Authorization policies for scoped clients

use crds::OwnedResource;

/// Decides whether an identity may access a resource
pub trait Authorizer<K>: Send + Sync {
    fn is_allowed(&self, user: &str, resource: &K) -> bool;
}

/// Grants access to the owner and co-owners of a resource
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerAuthorizer;

impl<K: OwnedResource> Authorizer<K> for OwnerAuthorizer {
    fn is_allowed(&self, user: &str, resource: &K) -> bool {
        resource.is_owned_by(user)
    }
}
