//! Redirect status codes
//!
//! Only a fixed set of HTTP codes may be used for a redirect. Code 200 means
//! "render an HTML page that forwards the browser after a delay".

use std::borrow::Cow;
use std::fmt;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// HTTP codes accepted by the `code` field
pub const ALLOWED_CODES: [u16; 9] = [200, 300, 301, 302, 303, 304, 305, 307, 308];

/// A validated redirect status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct RedirectCode(u16);

impl RedirectCode {
    /// Temporary redirect, the Shortlink default
    pub const TEMPORARY: Self = Self(307);
    /// Permanent redirect, the Redirect default
    pub const PERMANENT: Self = Self(308);
    /// Serve the delayed HTML forwarding page
    pub const HTML_PAGE: Self = Self(200);

    /// Validates and wraps a raw status code
    pub fn new(code: u16) -> Result<Self, SpecError> {
        if ALLOWED_CODES.contains(&code) {
            Ok(Self(code))
        } else {
            Err(SpecError::InvalidCode(code))
        }
    }

    /// Raw numeric value
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// True when the code asks for the HTML forwarding page instead of a 3xx
    pub fn is_html_page(self) -> bool {
        self == Self::HTML_PAGE
    }
}

impl Default for RedirectCode {
    fn default() -> Self {
        Self::TEMPORARY
    }
}

impl TryFrom<u16> for RedirectCode {
    type Error = SpecError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<RedirectCode> for u16 {
    fn from(code: RedirectCode) -> Self {
        code.0
    }
}

impl fmt::Display for RedirectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl JsonSchema for RedirectCode {
    fn schema_name() -> Cow<'static, str> {
        "RedirectCode".into()
    }

    fn inline_schema() -> bool {
        true
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "integer",
            "enum": ALLOWED_CODES,
        })
    }
}
