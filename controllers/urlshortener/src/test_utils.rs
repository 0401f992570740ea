//! Test utilities for unit testing reconcilers and HTTP handlers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::api::auth::{Identity, IdentityError, IdentityProvider};
use crate::metrics::MetricsSink;
use crate::reconciler::Reconciler;
use crds::*;
use k8s_openapi::api::networking::v1::Ingress;
use shortlink_client::{IngressClient, MockStore, RedirectClient, ShortlinkClient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_NAMESPACE: &str = "default";

/// Metrics sink that remembers what it was told
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    pub active: Mutex<HashMap<String, usize>>,
    pub invocations: Mutex<HashMap<(String, String), u64>>,
    pub reconciles: Mutex<Vec<String>>,
    pub redirects: Mutex<Vec<u16>>,
}

impl RecordingMetrics {
    pub fn active(&self, kind: &str) -> Option<usize> {
        self.active.lock().unwrap().get(kind).copied()
    }

    pub fn invocations(&self, name: &str) -> Option<u64> {
        self.invocations
            .lock()
            .unwrap()
            .get(&(name.to_string(), TEST_NAMESPACE.to_string()))
            .copied()
    }

    pub fn reconcile_count(&self, kind: &str) -> usize {
        self.reconciles.lock().unwrap().iter().filter(|k| *k == kind).count()
    }

    pub fn redirects(&self) -> Vec<u16> {
        self.redirects.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn set_active(&self, kind: &str, count: usize) {
        self.active.lock().unwrap().insert(kind.to_string(), count);
    }

    fn set_invocations(&self, name: &str, namespace: &str, count: u64) {
        self.invocations
            .lock()
            .unwrap()
            .insert((name.to_string(), namespace.to_string()), count);
    }

    fn forget_invocations(&self, name: &str, namespace: &str) {
        self.invocations
            .lock()
            .unwrap()
            .remove(&(name.to_string(), namespace.to_string()));
    }

    fn observe_reconcile(&self, kind: &str, _elapsed: Duration) {
        self.reconciles.lock().unwrap().push(kind.to_string());
    }

    fn record_redirect(&self, code: u16) {
        self.redirects.lock().unwrap().push(code);
    }
}

/// Identity provider backed by a fixed token table
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, String>,
}

impl StaticIdentityProvider {
    pub fn new(tokens: &[(&str, &str)]) -> Self {
        Self {
            tokens: tokens.iter().map(|(t, u)| (t.to_string(), u.to_string())).collect(),
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn identify(&self, token: &str) -> Result<Identity, IdentityError> {
        self.tokens
            .get(token)
            .map(|login| Identity { login: login.clone() })
            .ok_or(IdentityError::Rejected(401))
    }
}

/// Mock stores wired into a reconciler
pub struct TestEnv {
    pub redirects: MockStore<Redirect>,
    pub ingresses: MockStore<Ingress>,
    pub shortlinks: MockStore<Shortlink>,
    pub metrics: Arc<RecordingMetrics>,
    pub reconciler: Reconciler,
}

impl TestEnv {
    pub fn new() -> Self {
        let redirects = MockStore::new(TEST_NAMESPACE);
        let ingresses = MockStore::new(TEST_NAMESPACE);
        let shortlinks = MockStore::new(TEST_NAMESPACE);
        let metrics = Arc::new(RecordingMetrics::default());
        let reconciler = Reconciler::new(
            RedirectClient::new(Arc::new(redirects.clone())),
            IngressClient::new(Arc::new(ingresses.clone())),
            ShortlinkClient::new(Arc::new(shortlinks.clone())),
            metrics.clone(),
        );
        Self {
            redirects,
            ingresses,
            shortlinks,
            metrics,
            reconciler,
        }
    }
}

/// Helper to create test Shortlink CRD
pub fn create_test_shortlink(name: &str, owner: &str, target: &str, code: u16) -> Shortlink {
    Shortlink::new(
        name,
        ShortlinkSpec {
            owner: owner.to_string(),
            co_owners: vec![],
            target: target.to_string(),
            redirect_after: 0,
            code: RedirectCode::new(code).unwrap(),
        },
    )
}

/// Helper to create test Redirect CRD
pub fn create_test_redirect(name: &str, source: &str, target: &str) -> Redirect {
    let mut redirect = Redirect::new(
        name,
        RedirectSpec {
            source: source.to_string(),
            target: target.to_string(),
            code: RedirectCode::PERMANENT,
            ingress_class_name: Some("nginx".to_string()),
            tls: RedirectTls::default(),
        },
    );
    redirect.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    redirect.metadata.uid = Some(format!("uid-{name}"));
    redirect
}
