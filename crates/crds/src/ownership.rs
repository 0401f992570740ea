//! Ownership model shared by user-managed resources
//!
//! A resource is owned by exactly one user plus an optional list of
//! co-owners. Identity comparison is exact string equality.

use chrono::{DateTime, Utc};

/// Resources whose access is scoped to an owner and co-owners
pub trait OwnedResource {
    /// Primary owner
    fn owner(&self) -> &str;

    /// Additional users with the same rights as the owner
    fn co_owners(&self) -> &[String];

    /// Overwrites the primary owner
    fn set_owner(&mut self, user: &str);

    /// Records who changed the resource last and when (observed state)
    fn record_change(&mut self, user: &str, at: DateTime<Utc>);

    /// True if `user` is the owner or one of the co-owners
    fn is_owned_by(&self, user: &str) -> bool {
        self.owner() == user || self.co_owners().iter().any(|co| co == user)
    }
}
