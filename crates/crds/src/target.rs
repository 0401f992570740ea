//! Redirect target normalization and validation

use crate::error::SpecError;

/// Suffix that makes nginx append the original request URI to the redirect
pub const REQUEST_URI_SUFFIX: &str = "$request_uri";

/// Schemes a target may carry explicitly
pub const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// RFC 3986 scheme: a letter followed by letters, digits, `+`, `-` or `.`
fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Scheme of `target` when it starts with `<scheme>://`
pub fn scheme_of(target: &str) -> Option<&str> {
    target
        .split_once("://")
        .map(|(prefix, _)| prefix)
        .filter(|prefix| is_scheme(prefix))
}

/// Returns true when the target starts with a `<scheme>://` prefix
pub fn has_protocol(target: &str) -> bool {
    scheme_of(target).is_some()
}

/// Accepts bare hosts and `http`/`https` URLs.
///
/// Any other explicit scheme (`javascript://`, `data://`, ...) and a
/// separator with nothing in front of it are rejected.
pub fn validate_target(target: &str) -> Result<(), SpecError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(SpecError::EmptyTarget);
    }
    if let Some((prefix, _)) = target.split_once("://") {
        let allowed = ALLOWED_SCHEMES.iter().any(|s| prefix.eq_ignore_ascii_case(s));
        if prefix.is_empty() || (is_scheme(prefix) && !allowed) {
            return Err(SpecError::UnsupportedScheme(prefix.to_string()));
        }
    }
    Ok(())
}

/// Normalizes a redirect target.
///
/// Targets without a protocol are rewritten to `http://<target>$request_uri`
/// so path and query survive the redirect. Targets that already carry a
/// scheme are returned unchanged.
pub fn normalize_target(target: &str) -> String {
    if has_protocol(target) {
        target.to_string()
    } else {
        format!("http://{target}{REQUEST_URI_SUFFIX}")
    }
}
