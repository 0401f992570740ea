//! Kubernetes resource watchers.
//!
//! Both watchers go through `watch_resource()`, which drives a
//! `kube_runtime::Controller` and maps reconcile failures onto the
//! per-object Fibonacci backoff kept by the `Reconciler`.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::reconciler::ingress::managed_ingress_selector;
use crds::{Redirect, Shortlink};
use futures::StreamExt;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Api, ResourceExt};
use kube_runtime::{Controller, controller, watcher, controller::{Action, Config as ControllerConfig}};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

fn object_key<K: kube::Resource>(kind: &str, obj: &K) -> String {
    Reconciler::resource_key(kind, &obj.namespace().unwrap_or_default(), &obj.name_any())
}

/// Deleted before its queued reconcile ran; routine on every delete
fn is_deleted_object<E1, E2>(error: &controller::Error<E1, E2>) -> bool
where
    E1: std::error::Error + 'static,
    E2: std::error::Error + 'static,
{
    matches!(error, controller::Error::ObjectNotFound(_))
}

/// Run `controller` until its stream ends.
///
/// Success resets the object's error count. Failures requeue after the next
/// Fibonacci delay, or wait for the next change when the error is permanent.
async fn watch_resource<K, F>(
    controller: Controller<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = object_key(resource_name, obj.as_ref());
        match ctx.backoff_after_error(&key, error) {
            Some(delay) => Action::requeue(delay),
            None => Action::await_change(),
        }
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = object_key(resource_name, obj.as_ref());
            debug!("Reconciling {}", key);
            let action = reconcile_fn(Arc::clone(&ctx), obj).await?;
            ctx.reset_error(&key);
            Ok::<_, ControllerError>(action)
        }
    };

    // Debounce batches bursts of events (our own status writes included)
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    controller
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok(_) => {}
                Err(e) if is_deleted_object(&e) => debug!("{} {}, skipping", resource_name, e),
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    Ok(())
}

/// Watches urlshortener resources for changes.
#[derive(Clone)]
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    redirect_api: Api<Redirect>,
    ingress_api: Api<Ingress>,
    shortlink_api: Api<Shortlink>,
}

impl Watcher {
    pub fn new(
        reconciler: Arc<Reconciler>,
        redirect_api: Api<Redirect>,
        ingress_api: Api<Ingress>,
        shortlink_api: Api<Shortlink>,
    ) -> Self {
        Self {
            reconciler,
            redirect_api,
            ingress_api,
            shortlink_api,
        }
    }

    /// Reconciles Redirects, and re-reconciles the owning Redirect whenever
    /// one of our Ingresses changes.
    pub async fn watch_redirects(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(self.redirect_api.clone(), watcher::Config::default()).owns(
            self.ingress_api.clone(),
            watcher::Config::default().labels(&managed_ingress_selector()),
        );
        watch_resource(
            controller,
            Arc::clone(&self.reconciler),
            |reconciler, redirect: Arc<Redirect>| {
                Box::pin(async move {
                    reconciler.reconcile_redirect(&redirect.name_any()).await?;
                    Ok(Action::await_change())
                })
            },
            "Redirect",
        )
        .await
    }

    /// Republishes Shortlink metrics on every Shortlink change.
    pub async fn watch_shortlinks(&self) -> Result<(), ControllerError> {
        let controller = Controller::new(self.shortlink_api.clone(), watcher::Config::default());
        watch_resource(
            controller,
            Arc::clone(&self.reconciler),
            |reconciler, shortlink: Arc<Shortlink>| {
                Box::pin(async move {
                    reconciler.reconcile_shortlink(&shortlink.name_any()).await?;
                    Ok(Action::await_change())
                })
            },
            "Shortlink",
        )
        .await
    }
}
