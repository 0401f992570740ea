//! Ingress objects derived from Redirects
//!
//! Everything here is a pure function of the Redirect. The reconciler
//! overwrites whatever is stored with the result.

use std::collections::BTreeMap;

use crds::{Redirect, normalize_target};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressServiceBackend,
    IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

pub const REWRITE_TARGET_ANNOTATION: &str = "nginx.ingress.kubernetes.io/rewrite-target";
pub const PERMANENT_REDIRECT_ANNOTATION: &str = "nginx.ingress.kubernetes.io/permanent-redirect";
pub const PERMANENT_REDIRECT_CODE_ANNOTATION: &str = "nginx.ingress.kubernetes.io/permanent-redirect-code";

/// Placeholder backend; nginx answers from the annotations before routing
pub const BACKEND_SERVICE_NAME: &str = "http-svc";
pub const BACKEND_SERVICE_PORT: i32 = 80;

const APP_LABEL: &str = "app";
const APP_NAME: &str = "urlshortener";
const REDIRECT_LABEL: &str = "redirect";

/// Labels shared by every Ingress derived from Redirect `name`
pub fn labels_for_redirect(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), APP_NAME.to_string()),
        (REDIRECT_LABEL.to_string(), name.to_string()),
    ])
}

/// Label selector matching `labels_for_redirect(name)`
pub fn label_selector_for_redirect(name: &str) -> String {
    format!("{APP_LABEL}={APP_NAME},{REDIRECT_LABEL}={name}")
}

/// Selector for every Ingress managed by the controller
pub fn managed_ingress_selector() -> String {
    format!("{APP_LABEL}={APP_NAME}")
}

/// TLS secret for `host`: `a.b.com` becomes `a-b-com-redirect-secret`
pub fn tls_secret_name(host: &str) -> String {
    format!("{}-redirect-secret", host.replace('.', "-"))
}

/// Desired Ingress for `redirect`, named after it and owned by it
pub fn build_redirect_ingress(redirect: &Redirect) -> Ingress {
    let name = redirect.name_any();
    let spec = &redirect.spec;
    let target = normalize_target(&spec.target);

    let mut annotations = BTreeMap::from([
        (REWRITE_TARGET_ANNOTATION.to_string(), "/".to_string()),
        (PERMANENT_REDIRECT_ANNOTATION.to_string(), target),
        (PERMANENT_REDIRECT_CODE_ANNOTATION.to_string(), spec.code.to_string()),
    ]);

    let tls = if spec.tls.enable {
        // user annotations win on key collisions
        annotations.extend(spec.tls.annotations.clone());
        Some(vec![IngressTLS {
            hosts: Some(vec![spec.source.clone()]),
            secret_name: Some(tls_secret_name(&spec.source)),
        }])
    } else {
        None
    };

    let rule = IngressRule {
        host: Some(spec.source.clone()),
        http: Some(HTTPIngressRuleValue {
            paths: vec![HTTPIngressPath {
                path: Some("/".to_string()),
                path_type: "Prefix".to_string(),
                backend: IngressBackend {
                    service: Some(IngressServiceBackend {
                        name: BACKEND_SERVICE_NAME.to_string(),
                        port: Some(ServiceBackendPort {
                            number: Some(BACKEND_SERVICE_PORT),
                            name: None,
                        }),
                    }),
                    resource: None,
                },
            }],
        }),
    };

    Ingress {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: redirect.namespace(),
            labels: Some(labels_for_redirect(&name)),
            annotations: Some(annotations),
            owner_references: redirect.controller_owner_ref(&()).map(|owner| vec![owner]),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: spec.ingress_class_name.clone(),
            rules: Some(vec![rule]),
            tls,
            default_backend: None,
        }),
        status: None,
    }
}

/// True when `existing` already carries everything `desired` sets
pub fn ingress_matches(existing: &Ingress, desired: &Ingress) -> bool {
    existing.metadata.labels == desired.metadata.labels
        && existing.metadata.annotations == desired.metadata.annotations
        && existing.metadata.owner_references == desired.metadata.owner_references
        && existing.spec == desired.spec
}

/// Sorted names of `ingresses`
pub fn ingress_names(ingresses: &[Ingress]) -> Vec<String> {
    let mut names: Vec<String> = ingresses.iter().map(ResourceExt::name_any).collect();
    names.sort();
    names
}

/// Redirect target an Ingress actually applies
pub fn redirect_target_of(ingress: &Ingress) -> Option<String> {
    ingress.annotations().get(PERMANENT_REDIRECT_ANNOTATION).cloned()
}
