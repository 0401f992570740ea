//! Reconciliation logic for urlshortener resources.
//!
//! - `redirect`: Redirect to Ingress convergence and status
//! - `shortlink`: Shortlink counts republished as metrics
//! - `ingress`: construction of the derived Ingress objects

pub mod ingress;
pub mod redirect;
pub mod shortlink;

#[cfg(test)]
mod ingress_test;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shortlink_client::{IngressClient, RedirectClient, ShortlinkClient};
use tracing::{error, warn};

use crate::backoff::BackoffRegistry;
use crate::error::ControllerError;
use crate::metrics::MetricsSink;

pub use redirect::ReconcileOutcome;

/// Reconciles Redirect and Shortlink resources.
pub struct Reconciler {
    pub(crate) redirects: RedirectClient,
    pub(crate) ingresses: IngressClient,
    pub(crate) shortlinks: ShortlinkClient,
    pub(crate) metrics: Arc<dyn MetricsSink>,
    /// Consecutive failures per object (kind/namespace/name)
    backoff_states: BackoffRegistry,
    /// Shortlinks whose invocation series were published by the last pass
    published_shortlinks: Mutex<BTreeSet<String>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        redirects: RedirectClient,
        ingresses: IngressClient,
        shortlinks: ShortlinkClient,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            redirects,
            ingresses,
            shortlinks,
            metrics,
            backoff_states: BackoffRegistry::default(),
            published_shortlinks: Mutex::default(),
        }
    }

    /// Key used to track backoff for one object
    pub fn resource_key(kind: &str, namespace: &str, name: &str) -> String {
        format!("{kind}/{namespace}/{name}")
    }

    /// Requeue delay after a failed reconciliation, `None` when requeueing
    /// cannot help and the object should wait for its next change
    pub fn backoff_after_error(&self, resource_key: &str, error: &ControllerError) -> Option<Duration> {
        if error.is_permanent() {
            warn!("Reconciliation of {} failed permanently, waiting for a change: {}", resource_key, error);
            self.backoff_states.reset(resource_key);
            return None;
        }
        let (delay, error_count) = self.backoff_states.record_failure(resource_key);
        error!(
            "Reconciliation of {} failed ({} consecutive errors), retrying in {}s: {}",
            resource_key,
            error_count,
            delay.as_secs(),
            error
        );
        Some(delay)
    }

    /// Reset error count for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        self.backoff_states.reset(resource_key);
    }

    /// Consecutive failures recorded for a resource
    pub fn error_count(&self, resource_key: &str) -> u32 {
        self.backoff_states.error_count(resource_key)
    }
}
