//! Controller configuration
//!
//! Read once at start-up from environment variables.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::ControllerError;

/// Namespace file mounted into every pod with a service account
pub const SERVICE_ACCOUNT_NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8443";
const DEFAULT_PROBE_BIND_ADDRESS: &str = "0.0.0.0:9081";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address of the redirect handler and Shortlink API
    pub bind_address: SocketAddr,
    /// Address of `/healthz`, `/readyz` and `/metrics`
    pub probe_bind_address: SocketAddr,
    /// Namespace all resources are read from and written to
    pub namespace: String,
    /// Base URL of the GitHub REST API used to resolve bearer tokens
    pub github_api_url: String,
    /// Upper bound for every resource store call
    pub store_timeout: Duration,
    /// Lower the default log level to debug
    pub debug: bool,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            Path::new(SERVICE_ACCOUNT_NAMESPACE_FILE),
        )
    }

    /// Load configuration from `lookup`, falling back to the namespace stored
    /// in `namespace_file` and then `default`
    pub fn from_lookup<F>(lookup: F, namespace_file: &Path) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address = parse_addr("BIND_ADDRESS", lookup("BIND_ADDRESS"), DEFAULT_BIND_ADDRESS)?;
        let probe_bind_address = parse_addr(
            "PROBE_BIND_ADDRESS",
            lookup("PROBE_BIND_ADDRESS"),
            DEFAULT_PROBE_BIND_ADDRESS,
        )?;

        let namespace = lookup("WATCH_NAMESPACE")
            .filter(|ns| !ns.trim().is_empty())
            .or_else(|| {
                std::fs::read_to_string(namespace_file)
                    .ok()
                    .map(|ns| ns.trim().to_string())
                    .filter(|ns| !ns.is_empty())
            })
            .unwrap_or_else(|| "default".to_string());

        let github_api_url = lookup("GITHUB_API_URL")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let store_timeout_secs = match lookup("STORE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
                ControllerError::InvalidConfig(format!(
                    "STORE_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                ))
            })?,
            None => DEFAULT_STORE_TIMEOUT_SECS,
        };

        let debug = match lookup("DEBUG") {
            Some(raw) => parse_bool("DEBUG", &raw)?,
            None => false,
        };

        Ok(Self {
            bind_address,
            probe_bind_address,
            namespace,
            github_api_url,
            store_timeout: Duration::from_secs(store_timeout_secs),
            debug,
        })
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub fn default_log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

fn parse_addr(key: &str, raw: Option<String>, default: &str) -> Result<SocketAddr, ControllerError> {
    let raw = raw.unwrap_or_else(|| default.to_string());
    // ":8443" is accepted as shorthand for all interfaces
    let normalized = if raw.starts_with(':') { format!("0.0.0.0{raw}") } else { raw.clone() };
    normalized
        .parse()
        .map_err(|e| ControllerError::InvalidConfig(format!("{key} '{raw}' is not a socket address: {e}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ControllerError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ControllerError::InvalidConfig(format!("{key} must be a boolean, got '{other}'"))),
    }
}
