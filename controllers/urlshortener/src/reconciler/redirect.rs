//! Redirect reconciler
//!
//! Converges the Ingress derived from a Redirect and mirrors what was
//! applied into the Redirect status. Each pass recomputes everything from
//! the current spec, so a pass interrupted half-way is repaired by the next.

use std::time::Instant;

use crds::{RedirectStatus, normalize_target};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use shortlink_client::ClientError;
use tracing::{debug, info, warn};

use super::Reconciler;
use super::ingress::{
    build_redirect_ingress, ingress_matches, ingress_names, label_selector_for_redirect, redirect_target_of,
};
use crate::error::ControllerError;

const KIND: &str = "Redirect";

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Ingress and status reflect the current spec
    Converged { ingress_names: Vec<String>, target: String },
    /// The Redirect (or an object it needs) disappeared during the pass
    Deleted,
}

/// Turns a store NotFound into the terminal `Deleted` outcome
fn or_deleted<T>(result: Result<T, ClientError>, name: &str, step: &str) -> Result<Option<T>, ControllerError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            info!("Redirect {} went away during {}, nothing left to do", name, step);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

impl Reconciler {
    /// Reconcile the Redirect `name` in the client namespace
    pub async fn reconcile_redirect(&self, name: &str) -> Result<ReconcileOutcome, ControllerError> {
        let started = Instant::now();
        let result = self.converge_redirect(name).await;
        self.metrics.observe_reconcile(KIND, started.elapsed());
        if result.is_ok() {
            self.publish_active_redirects().await;
        }
        result
    }

    async fn converge_redirect(&self, name: &str) -> Result<ReconcileOutcome, ControllerError> {
        let namespace = self.redirects.namespace().to_string();

        let Some(mut redirect) = or_deleted(self.redirects.get(name).await, name, "read")? else {
            return Ok(ReconcileOutcome::Deleted);
        };
        info!("Reconciling Redirect {}/{}", namespace, name);

        redirect.spec.validate().map_err(ClientError::from)?;

        let desired = build_redirect_ingress(&redirect);
        let Some(applied) = self.upsert_ingress(name, desired).await? else {
            return Ok(ReconcileOutcome::Deleted);
        };

        let selector = label_selector_for_redirect(name);
        let Some(owned) = or_deleted(self.ingresses.list_by_labels(&selector).await, name, "ingress listing")? else {
            return Ok(ReconcileOutcome::Deleted);
        };
        let names = ingress_names(&owned);
        let target = redirect_target_of(&applied).unwrap_or_else(|| normalize_target(&redirect.spec.target));

        let status = RedirectStatus {
            ingress_name: names.clone(),
            target: Some(target.clone()),
        };
        if redirect.status.as_ref() == Some(&status) {
            debug!("Redirect {}/{} status unchanged, skipping update", namespace, name);
        } else {
            redirect.status = Some(status);
            if or_deleted(self.redirects.update_status(&redirect).await, name, "status update")?.is_none() {
                return Ok(ReconcileOutcome::Deleted);
            }
            info!("Redirect {}/{} status updated: ingresses={:?} target={}", namespace, name, names, target);
        }

        Ok(ReconcileOutcome::Converged {
            ingress_names: names,
            target,
        })
    }

    /// Create the Ingress or overwrite it with `desired`.
    /// Returns the Ingress as stored after the call.
    async fn upsert_ingress(&self, name: &str, mut desired: Ingress) -> Result<Option<Ingress>, ControllerError> {
        match self.ingresses.get(name).await {
            Ok(existing) if ingress_matches(&existing, &desired) => {
                debug!("Ingress {} already up to date", name);
                Ok(Some(existing))
            }
            Ok(existing) => {
                desired.metadata.resource_version = existing.resource_version();
                let updated = or_deleted(self.ingresses.update(&desired).await, name, "ingress update")?;
                if updated.is_some() {
                    info!("Updated Ingress {}/{}", self.ingresses.namespace(), name);
                }
                Ok(updated)
            }
            Err(e) if e.is_not_found() => {
                let created = or_deleted(self.ingresses.create(desired).await, name, "ingress create")?;
                if created.is_some() {
                    info!("Created Ingress {}/{}", self.ingresses.namespace(), name);
                }
                Ok(created)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish_active_redirects(&self) {
        match self.redirects.list().await {
            Ok(all) => self.metrics.set_active(KIND, all.len()),
            Err(e) => warn!("Failed to count Redirects: {}", e),
        }
    }
}
