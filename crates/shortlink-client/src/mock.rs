//! Mock ResourceStore for unit testing
//!
//! Stores objects in memory and mimics the API server semantics the
//! controller relies on: resource versions, conflicts, the status
//! subresource, label selectors and UID assignment.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kube::ResourceExt;
use serde_json::Value;

use crate::error::ClientError;
use crate::store_trait::{ResourceStore, StoreResource};

/// Store operations that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MockOperation {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

#[derive(Debug)]
struct MockState<K> {
    objects: BTreeMap<String, K>,
    next_version: u64,
    writes: usize,
    failing: BTreeSet<MockOperation>,
}

/// Mock store for testing
///
/// Cloning shares the underlying state, so a test can keep a handle while the
/// code under test owns another.
#[derive(Debug)]
pub struct MockStore<K> {
    namespace: String,
    state: Arc<Mutex<MockState<K>>>,
}

impl<K> Clone for MockStore<K> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<K: StoreResource> MockStore<K> {
    /// Create an empty store for `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: Arc::new(Mutex::new(MockState {
                objects: BTreeMap::new(),
                next_version: 1,
                writes: 0,
                failing: BTreeSet::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object as-is, status included (for test setup)
    pub fn insert(&self, mut obj: K) {
        let mut state = self.state();
        let version = state.bump();
        let meta = obj.meta_mut();
        meta.namespace = Some(self.namespace.clone());
        meta.resource_version = Some(version);
        if meta.uid.is_none() {
            meta.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        state.objects.insert(obj.name_any(), obj);
    }

    /// Current copy of an object, if present
    pub fn object(&self, name: &str) -> Option<K> {
        self.state().objects.get(name).cloned()
    }

    /// All stored objects ordered by name
    pub fn objects(&self) -> Vec<K> {
        self.state().objects.values().cloned().collect()
    }

    /// Number of successful create/update/update_status/delete calls
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Make `op` fail with a 500 API error until `recover` is called
    pub fn fail_on(&self, op: MockOperation) {
        self.state().failing.insert(op);
    }

    /// Stop failing `op`
    pub fn recover(&self, op: MockOperation) {
        self.state().failing.remove(&op);
    }
}

impl<K> MockState<K> {
    fn bump(&mut self) -> String {
        let version = self.next_version;
        self.next_version += 1;
        version.to_string()
    }

    fn check(&self, op: MockOperation) -> Result<(), ClientError> {
        if self.failing.contains(&op) {
            return Err(ClientError::Api {
                code: 500,
                message: format!("injected failure for {op:?}"),
            });
        }
        Ok(())
    }
}

fn require_name<K: StoreResource>(obj: &K) -> Result<String, ClientError> {
    obj.meta()
        .name
        .clone()
        .ok_or_else(|| ClientError::InvalidObject(format!("{} without metadata.name", K::kind_name())))
}

fn check_version<K: StoreResource>(incoming: &K, stored: &K) -> Result<(), ClientError> {
    match incoming.resource_version() {
        Some(rv) if Some(&rv) != stored.meta().resource_version.as_ref() => Err(ClientError::Conflict(format!(
            "{} '{}' resourceVersion {rv} is stale",
            K::kind_name(),
            stored.name_any()
        ))),
        _ => Ok(()),
    }
}

/// Copy of `base` whose status is taken from `source` (removed when `source` is None)
fn with_status_of<K: StoreResource>(base: &K, source: Option<&K>) -> Result<K, ClientError> {
    let mut value = serde_json::to_value(base)?;
    let status = match source {
        Some(src) => serde_json::to_value(src)?.get("status").cloned(),
        None => None,
    };
    if let Value::Object(map) = &mut value {
        match status {
            Some(status) => {
                map.insert("status".to_string(), status);
            }
            None => {
                map.remove("status");
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// `k=v,k2=v2` equality selector match
fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key.trim()).is_some_and(|v| v == value.trim()),
            None => labels.contains_key(term),
        })
}

#[async_trait]
impl<K: StoreResource> ResourceStore<K> for MockStore<K> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, name: &str) -> Result<K, ClientError> {
        let state = self.state();
        state.check(MockOperation::Get)?;
        state
            .objects
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::not_found(&K::kind_name(), name))
    }

    async fn list(&self, label_selector: Option<&str>) -> Result<Vec<K>, ClientError> {
        let state = self.state();
        state.check(MockOperation::List)?;
        Ok(state
            .objects
            .values()
            .filter(|obj| label_selector.is_none_or(|sel| matches_selector(obj.labels(), sel)))
            .cloned()
            .collect())
    }

    async fn create(&self, obj: &K) -> Result<K, ClientError> {
        let name = require_name(obj)?;
        let mut state = self.state();
        state.check(MockOperation::Create)?;
        if state.objects.contains_key(&name) {
            return Err(ClientError::Conflict(format!("{} '{name}' already exists", K::kind_name())));
        }

        let mut created = with_status_of(obj, None)?;
        let version = state.bump();
        let meta = created.meta_mut();
        meta.namespace = Some(self.namespace.clone());
        meta.resource_version = Some(version);
        meta.uid = Some(uuid::Uuid::new_v4().to_string());

        state.objects.insert(name, created.clone());
        state.writes += 1;
        Ok(created)
    }

    async fn update(&self, obj: &K) -> Result<K, ClientError> {
        let name = require_name(obj)?;
        let mut state = self.state();
        state.check(MockOperation::Update)?;
        let stored = state
            .objects
            .get(&name)
            .ok_or_else(|| ClientError::not_found(&K::kind_name(), &name))?;
        check_version(obj, stored)?;

        let mut updated = with_status_of(obj, Some(stored))?;
        let uid = stored.meta().uid.clone();
        let version = state.bump();
        let meta = updated.meta_mut();
        meta.namespace = Some(self.namespace.clone());
        meta.resource_version = Some(version);
        meta.uid = uid;

        state.objects.insert(name, updated.clone());
        state.writes += 1;
        Ok(updated)
    }

    async fn update_status(&self, obj: &K) -> Result<K, ClientError> {
        let name = require_name(obj)?;
        let mut state = self.state();
        state.check(MockOperation::UpdateStatus)?;
        let stored = state
            .objects
            .get(&name)
            .ok_or_else(|| ClientError::not_found(&K::kind_name(), &name))?;
        check_version(obj, stored)?;

        let mut updated = with_status_of(stored, Some(obj))?;
        let version = state.bump();
        updated.meta_mut().resource_version = Some(version);

        state.objects.insert(name, updated.clone());
        state.writes += 1;
        Ok(updated)
    }

    async fn delete(&self, name: &str) -> Result<(), ClientError> {
        let mut state = self.state();
        state.check(MockOperation::Delete)?;
        state
            .objects
            .remove(name)
            .ok_or_else(|| ClientError::not_found(&K::kind_name(), name))?;
        state.writes += 1;
        Ok(())
    }
}
