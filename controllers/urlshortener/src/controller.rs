//! Main controller implementation.
//!
//! Builds the kube-backed stores and clients once, then runs the Redirect
//! and Shortlink watchers next to the API server and the probe server until
//! a shutdown signal arrives or a watcher stops.

use crate::api::templates::Pages;
use crate::api::{self, ApiState, GitHubIdentityProvider, OpsState};
use crate::config::Config;
use crate::error::ControllerError;
use crate::metrics::{MetricsSink, PrometheusMetrics};
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crds::{Redirect, Shortlink};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Api, Client};
use shortlink_client::{
    IngressClient, KubeStore, OwnerAuthorizer, RedirectClient, ShortlinkClient, UserShortlinkClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Upper bound for one identity provider round trip
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Main controller for urlshortener resources.
pub struct Controller {
    config: Config,
    watcher: Arc<Watcher>,
    api_state: ApiState,
    ops_state: OpsState,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing urlshortener controller");

        let kube_client = Client::try_default().await?;
        let ns = config.namespace.as_str();
        let timeout = config.store_timeout;

        let shortlinks = ShortlinkClient::new(Arc::new(KubeStore::<Shortlink>::new(kube_client.clone(), ns, timeout)));
        let redirects = RedirectClient::new(Arc::new(KubeStore::<Redirect>::new(kube_client.clone(), ns, timeout)));
        let ingresses = IngressClient::new(Arc::new(KubeStore::<Ingress>::new(kube_client.clone(), ns, timeout)));

        let metrics = PrometheusMetrics::new()
            .map_err(|e| ControllerError::InvalidConfig(format!("failed to register metrics: {e}")))?;
        let sink: Arc<dyn MetricsSink> = Arc::new(metrics.clone());

        let reconciler = Arc::new(Reconciler::new(redirects, ingresses, shortlinks.clone(), Arc::clone(&sink)));
        let watcher = Arc::new(Watcher::new(
            reconciler,
            Api::namespaced(kube_client.clone(), ns),
            Api::namespaced(kube_client.clone(), ns),
            Api::namespaced(kube_client, ns),
        ));

        let identity = GitHubIdentityProvider::new(&config.github_api_url, IDENTITY_TIMEOUT)
            .map_err(|e| ControllerError::InvalidConfig(format!("failed to build identity client: {e}")))?;
        let pages = Pages::new()
            .map_err(|e| ControllerError::InvalidConfig(format!("failed to compile page templates: {e}")))?;
        let api_state = ApiState {
            shortlinks: UserShortlinkClient::new(shortlinks.clone(), OwnerAuthorizer),
            public: shortlinks,
            identity: Arc::new(identity),
            metrics: sink,
            pages: Arc::new(pages),
        };

        Ok(Self {
            config,
            watcher,
            api_state,
            ops_state: OpsState::new(metrics),
        })
    }

    /// Runs until SIGINT/SIGTERM, a watcher exits or a server fails.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Starting urlshortener controller in namespace {}", self.config.namespace);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut api_server = spawn_server(
            "api",
            self.config.bind_address,
            api::router(self.api_state),
            shutdown_rx.clone(),
        );
        let mut ops_server = spawn_server(
            "ops",
            self.config.probe_bind_address,
            api::ops_router(self.ops_state.clone()),
            shutdown_rx,
        );

        let mut redirect_watcher = {
            let watcher = Arc::clone(&self.watcher);
            tokio::spawn(async move { watcher.watch_redirects().await })
        };
        let mut shortlink_watcher = {
            let watcher = Arc::clone(&self.watcher);
            tokio::spawn(async move { watcher.watch_shortlinks().await })
        };
        self.ops_state.mark_ready();

        let outcome = tokio::select! {
            () = shutdown_signal() => {
                info!("Shutdown signal received");
                Ok(())
            }
            result = &mut redirect_watcher => unexpected_exit("Redirect watcher", result),
            result = &mut shortlink_watcher => unexpected_exit("Shortlink watcher", result),
            result = &mut api_server => unexpected_exit("API server", result),
            result = &mut ops_server => unexpected_exit("Probe server", result),
        };

        if let Err(e) = &outcome {
            error!("Stopping controller: {}", e);
        }

        // Servers drain in-flight requests, watchers are simply dropped
        shutdown_tx.send_replace(true);
        redirect_watcher.abort();
        shortlink_watcher.abort();
        for (name, server) in [("API server", api_server), ("Probe server", ops_server)] {
            if !server.is_finished() {
                if let Err(e) = joined(name, server.await) {
                    error!("{}", e);
                }
            }
        }

        info!("urlshortener controller stopped");
        outcome
    }
}

fn spawn_server(
    name: &'static str,
    addr: std::net::SocketAddr,
    router: axum::Router,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<Result<(), ControllerError>> {
    tokio::spawn(async move {
        api::serve(name, addr, router, wait_for_shutdown(shutdown)).await?;
        Ok(())
    })
}

type TaskResult = Result<Result<(), ControllerError>, tokio::task::JoinError>;

fn joined(name: &str, result: TaskResult) -> Result<(), ControllerError> {
    result
        .map_err(|e| ControllerError::Watch(format!("{name} panicked: {e}")))?
        .map_err(|e| ControllerError::Watch(format!("{name} error: {e}")))
}

/// Watchers and servers only return early when something is wrong
fn unexpected_exit(name: &str, result: TaskResult) -> Result<(), ControllerError> {
    joined(name, result)?;
    Err(ControllerError::Watch(format!("{name} exited unexpectedly")))
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
}
