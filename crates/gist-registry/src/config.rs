//! Registry configuration.
//!
//! Defaults suit an in-process registry. Override via environment variables
//! or explicit construction for tests.

use serde::{Deserialize, Serialize};

use gist_crypto::{DEFAULT_MAX_DEPTH, MAX_DEPTH_CEILING};
use gist_state::{DEFAULT_ID_TYPE, DEFAULT_RETURN_LIMIT};
use gist_verifier::DEFAULT_PAGE_LIMIT;

/// Tunables for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Initial GIST depth. Can only grow afterwards.
    pub smt_max_depth: usize,
    /// Maximum entries returned by one root history or state history page.
    pub history_return_limit: usize,
    /// Maximum requests returned by one request listing page.
    pub request_page_limit: usize,
    /// Type prefix for derived identity ids.
    pub default_id_type: [u8; 2],
    /// `EnvFilter` directive used by [`init_tracing`](crate::telemetry::init_tracing).
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            smt_max_depth: DEFAULT_MAX_DEPTH,
            history_return_limit: DEFAULT_RETURN_LIMIT,
            request_page_limit: DEFAULT_PAGE_LIMIT,
            default_id_type: DEFAULT_ID_TYPE,
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GIST_SMT_MAX_DEPTH` (default: 64)
    /// - `GIST_HISTORY_RETURN_LIMIT` (default: 1000)
    /// - `GIST_REQUEST_PAGE_LIMIT` (default: 1000)
    /// - `GIST_DEFAULT_ID_TYPE` (hex, default: `0112`)
    /// - `GIST_LOG` (default: `info`)
    /// - `GIST_LOG_JSON` (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            smt_max_depth: env_usize(&lookup, "GIST_SMT_MAX_DEPTH", defaults.smt_max_depth)?,
            history_return_limit: env_usize(
                &lookup,
                "GIST_HISTORY_RETURN_LIMIT",
                defaults.history_return_limit,
            )?,
            request_page_limit: env_usize(
                &lookup,
                "GIST_REQUEST_PAGE_LIMIT",
                defaults.request_page_limit,
            )?,
            default_id_type: env_id_type(&lookup, "GIST_DEFAULT_ID_TYPE", defaults.default_id_type)?,
            log_filter: lookup("GIST_LOG").unwrap_or(defaults.log_filter),
            log_json: env_bool(&lookup, "GIST_LOG_JSON", defaults.log_json)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smt_max_depth == 0 || self.smt_max_depth > MAX_DEPTH_CEILING {
            return Err(ConfigError::OutOfRange {
                field: "smt_max_depth",
                value: self.smt_max_depth,
                min: 1,
                max: MAX_DEPTH_CEILING,
            });
        }
        if self.history_return_limit == 0 {
            return Err(ConfigError::OutOfRange {
                field: "history_return_limit",
                value: 0,
                min: 1,
                max: usize::MAX,
            });
        }
        if self.request_page_limit == 0 {
            return Err(ConfigError::OutOfRange {
                field: "request_page_limit",
                value: 0,
                min: 1,
                max: usize::MAX,
            });
        }
        Ok(())
    }
}

fn env_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue(var.to_string(), e.to_string())),
    }
}

fn env_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(var).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "TRUE" | "yes") => Ok(true),
        Some("0" | "false" | "FALSE" | "no" | "") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("expected a boolean, got {other:?}"),
        )),
    }
}

fn env_id_type(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: [u8; 2],
) -> Result<[u8; 2], ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    gist_core::hex::decode(&raw)
        .and_then(|bytes| <[u8; 2]>::try_from(bytes.as_slice()).ok())
        .ok_or_else(|| ConfigError::InvalidValue(var.to_string(), "expected 2 hex-encoded bytes".to_string()))
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
}
