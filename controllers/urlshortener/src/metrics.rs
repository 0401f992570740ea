//! Controller metrics
//!
//! Reconcilers and the redirect handler report through the `MetricsSink`
//! trait. `PrometheusMetrics` owns its registry, so several instances can
//! coexist (one per test, for example).

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use tracing::debug;

/// Destination for controller and handler measurements
pub trait MetricsSink: Send + Sync {
    /// Number of objects of `kind` currently present
    fn set_active(&self, kind: &str, count: usize);

    /// Invocation count of one Shortlink
    fn set_invocations(&self, name: &str, namespace: &str, count: u64);

    /// Drop the invocation series of a deleted Shortlink
    fn forget_invocations(&self, name: &str, namespace: &str);

    /// Duration of one reconciliation pass
    fn observe_reconcile(&self, kind: &str, elapsed: Duration);

    /// One response served by the redirect handler
    fn record_redirect(&self, code: u16);
}

/// Prometheus-backed sink
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    active: IntGaugeVec,
    invocations: IntGaugeVec,
    reconcile_duration: HistogramVec,
    redirects: IntCounterVec,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let active = IntGaugeVec::new(
            Opts::new("urlshortener_active", "Number of objects of each kind"),
            &["kind"],
        )?;
        let invocations = IntGaugeVec::new(
            Opts::new("urlshortener_shortlink_invocations", "Invocation count of each Shortlink"),
            &["name", "namespace"],
        )?;
        let reconcile_duration = HistogramVec::new(
            HistogramOpts::new(
                "urlshortener_reconcile_duration_seconds",
                "Duration of reconciliation passes",
            ),
            &["kind"],
        )?;
        let redirects = IntCounterVec::new(
            Opts::new("urlshortener_redirects_total", "Responses served by the redirect handler"),
            &["code"],
        )?;

        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(invocations.clone()))?;
        registry.register(Box::new(reconcile_duration.clone()))?;
        registry.register(Box::new(redirects.clone()))?;

        Ok(Self {
            registry,
            active,
            invocations,
            reconcile_duration,
            redirects,
        })
    }

    /// Text exposition of every registered metric
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsSink for PrometheusMetrics {
    fn set_active(&self, kind: &str, count: usize) {
        self.active
            .with_label_values(&[kind])
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    fn set_invocations(&self, name: &str, namespace: &str, count: u64) {
        self.invocations
            .with_label_values(&[name, namespace])
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    fn forget_invocations(&self, name: &str, namespace: &str) {
        if let Err(e) = self.invocations.remove_label_values(&[name, namespace]) {
            debug!("No invocation series for Shortlink {}/{}: {}", namespace, name, e);
        }
    }

    fn observe_reconcile(&self, kind: &str, elapsed: Duration) {
        self.reconcile_duration
            .with_label_values(&[kind])
            .observe(elapsed.as_secs_f64());
    }

    fn record_redirect(&self, code: u16) {
        let code = code.to_string();
        self.redirects.with_label_values(&[code.as_str()]).inc();
    }
}
