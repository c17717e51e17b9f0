//! Per-invocation request options

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{WfetchError, WfetchResult};

/// Default HTTP method
pub const DEFAULT_METHOD: &str = "GET";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 3.0;

/// Options for a single fetch invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// HTTP method, passed through as given
    pub method: String,
    /// Raw `Key:Value` header strings, in command-line order
    pub header: Option<Vec<String>>,
    /// Request body
    pub data: Option<String>,
    /// Explicit wrangler config path
    pub config: Option<String>,
    /// Worker entry script, takes precedence over config
    pub entry: Option<String>,
    /// Timeout in seconds, as typed by the user
    pub timeout: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            header: None,
            data: None,
            config: None,
            entry: None,
            timeout: None,
        }
    }
}

impl FetchOptions {
    /// Create options for the given method with everything else unset
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Parse the timeout as floating-point seconds, falling back to the default.
    pub fn timeout_duration(&self) -> WfetchResult<Duration> {
        match self.timeout.as_deref() {
            None => Ok(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)),
            Some(raw) => parse_timeout(raw),
        }
    }
}

/// Parse a seconds value such as `3`, `0.5` or `0.01`
pub fn parse_timeout(raw: &str) -> WfetchResult<Duration> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| WfetchError::InvalidTimeout(format!("'{}' is not a number", raw)))?;

    Duration::try_from_secs_f64(secs).map_err(|_| {
        WfetchError::InvalidTimeout(format!(
            "'{}' must be a finite, non-negative number of seconds",
            raw
        ))
    })
}
