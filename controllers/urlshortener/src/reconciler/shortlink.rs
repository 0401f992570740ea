//! Shortlink reconciler
//!
//! Shortlinks have no derived objects. Reconciling one republishes the
//! Shortlink gauges for the whole namespace.

use std::collections::BTreeSet;
use std::sync::PoisonError;
use std::time::Instant;

use kube::ResourceExt;
use tracing::debug;

use super::Reconciler;
use crate::error::ControllerError;

const KIND: &str = "Shortlink";

impl Reconciler {
    /// Publish the number of Shortlinks and their invocation counts.
    ///
    /// The runtime never reconciles a deleted object, so every pass also
    /// drops the series of Shortlinks that disappeared since the previous one.
    pub async fn reconcile_shortlink(&self, name: &str) -> Result<(), ControllerError> {
        let started = Instant::now();
        let result = self.publish_shortlink_metrics(name).await;
        self.metrics.observe_reconcile(KIND, started.elapsed());
        result
    }

    async fn publish_shortlink_metrics(&self, name: &str) -> Result<(), ControllerError> {
        let namespace = self.shortlinks.namespace().to_string();
        let shortlinks = self.shortlinks.list().await?;

        self.metrics.set_active(KIND, shortlinks.len());
        let mut current = BTreeSet::new();
        for link in &shortlinks {
            let link_namespace = link.namespace().unwrap_or_else(|| namespace.clone());
            self.metrics
                .set_invocations(&link.name_any(), &link_namespace, link.invocation_count());
            current.insert(link.name_any());
        }

        let mut stale: BTreeSet<String> = {
            let mut published = self.published_shortlinks.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = std::mem::replace(&mut *published, current.clone());
            previous.difference(&current).cloned().collect()
        };
        if !current.contains(name) {
            stale.insert(name.to_string());
        }
        for gone in &stale {
            debug!("Shortlink {}/{} is gone, dropping its invocation series", namespace, gone);
            self.metrics.forget_invocations(gone, &namespace);
        }
        Ok(())
    }
}
