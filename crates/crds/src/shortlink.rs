//! Shortlink CRD
//!
//! A named short path that forwards visitors to a target URL. Served by the
//! urlshortener HTTP redirect handler.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::code::RedirectCode;
use crate::error::SpecError;
use crate::target::validate_target;
use crate::ownership::OwnedResource;

/// Upper bound for the delayed-redirect page countdown, in seconds
pub const MAX_REDIRECT_AFTER: u32 = 99;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "urlshortener.cedi.dev",
    version = "v1alpha1",
    kind = "Shortlink",
    namespaced,
    status = "ShortlinkStatus",
    printcolumn = r#"{"name":"Target","type":"string","jsonPath":".spec.target"}"#,
    printcolumn = r#"{"name":"Code","type":"integer","jsonPath":".spec.code"}"#,
    printcolumn = r#"{"name":"After","type":"integer","jsonPath":".spec.after"}"#,
    printcolumn = r#"{"name":"Invoked","type":"integer","jsonPath":".status.count"}"#
)]
pub struct ShortlinkSpec {
    /// GitHub login of the user that owns this Shortlink
    pub owner: String,

    /// Additional users allowed to manage this Shortlink
    #[serde(default, rename = "owners", skip_serializing_if = "Vec::is_empty")]
    pub co_owners: Vec<String>,

    /// Where the short path forwards to
    pub target: String,

    /// Seconds the HTML forwarding page waits before redirecting (code 200 only)
    #[serde(default, rename = "after")]
    #[schemars(range(max = 99))]
    pub redirect_after: u32,

    /// HTTP status used for the redirect; 200 renders the forwarding page
    #[serde(default)]
    pub code: RedirectCode,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct ShortlinkStatus {
    /// Number of times the short path was followed
    #[serde(default)]
    pub count: u64,

    /// Last time the Shortlink was changed through the API
    #[serde(default, rename = "lastmodified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    /// User that made the last change through the API
    #[serde(default, rename = "changedby", skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
}

impl ShortlinkSpec {
    /// Rejects specs the redirect handler cannot serve
    pub fn validate(&self) -> Result<(), SpecError> {
        validate_target(&self.target)?;
        if self.redirect_after > MAX_REDIRECT_AFTER {
            return Err(SpecError::RedirectAfterOutOfRange(self.redirect_after));
        }
        Ok(())
    }
}

impl Shortlink {
    /// Current invocation count (0 when no status was written yet)
    pub fn invocation_count(&self) -> u64 {
        self.status.as_ref().map_or(0, |s| s.count)
    }
}

impl OwnedResource for Shortlink {
    fn owner(&self) -> &str {
        &self.spec.owner
    }

    fn co_owners(&self) -> &[String] {
        &self.spec.co_owners
    }

    fn set_owner(&mut self, user: &str) {
        self.spec.owner = user.to_string();
    }

    fn record_change(&mut self, user: &str, at: DateTime<Utc>) {
        let status = self.status.get_or_insert_with(ShortlinkStatus::default);
        status.changed_by = Some(user.to_string());
        status.last_modified = Some(at);
    }
}
