//! Redirect CRD
//!
//! A host-level redirect. The controller materializes each Redirect as an
//! nginx Ingress carrying permanent-redirect annotations.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::code::RedirectCode;
use crate::error::SpecError;
use crate::target::validate_target;

fn default_redirect_code() -> RedirectCode {
    RedirectCode::PERMANENT
}

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "urlshortener.cedi.dev",
    version = "v1alpha1",
    kind = "Redirect",
    namespaced,
    status = "RedirectStatus",
    printcolumn = r#"{"name":"Source","type":"string","jsonPath":".spec.source"}"#,
    printcolumn = r#"{"name":"Target","type":"string","jsonPath":".spec.target"}"#,
    printcolumn = r#"{"name":"Code","type":"integer","jsonPath":".spec.code"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RedirectSpec {
    /// Host name requests are redirected from
    pub source: String,

    /// Where requests are redirected to
    pub target: String,

    /// HTTP status of the redirect
    #[serde(default = "default_redirect_code")]
    pub code: RedirectCode,

    /// IngressClass used for the generated Ingress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,

    /// TLS settings for the source host
    #[serde(default)]
    pub tls: RedirectTls,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectTls {
    /// Terminate TLS for the source host
    #[serde(default)]
    pub enable: bool,

    /// Extra annotations merged into the Ingress when TLS is enabled
    /// (e.g. a cert-manager issuer)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectStatus {
    /// Names of the Ingress objects derived from this Redirect
    #[serde(default)]
    pub ingress_name: Vec<String>,

    /// Normalized target as applied to the Ingress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RedirectSpec {
    /// Rejects specs that cannot be expressed as an Ingress redirect
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.source.trim().is_empty() {
            return Err(SpecError::EmptySource);
        }
        validate_target(&self.target)?;
        if self.code.is_html_page() {
            return Err(SpecError::UnsupportedRedirectCode(self.code.as_u16()));
        }
        Ok(())
    }
}
