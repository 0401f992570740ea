//! urlshortener Controller
//!
//! Kubernetes-native URL shortener:
//! - Redirect: converges an annotated nginx Ingress per Redirect resource
//! - Shortlink: resolved by the public `/{shortlink}` endpoint, managed by
//!   owners through the authenticated `/api/v1/shortlink` API
//!
//! Invocation counts live on the Shortlink status subresource and are
//! exported as Prometheus metrics on the probe address.

mod api;
mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // kube and reqwest both use rustls; pin the process-wide provider to ring
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        info!("rustls crypto provider already installed");
    }

    info!("Starting urlshortener controller");
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace);
    info!("  API address: {}", config.bind_address);
    info!("  Probe address: {}", config.probe_bind_address);
    info!("  GitHub API: {}", config.github_api_url);
    info!("  Store timeout: {}s", config.store_timeout.as_secs());

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
