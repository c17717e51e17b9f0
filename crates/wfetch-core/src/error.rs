//! Error types for workers-fetch

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for workers-fetch
#[derive(Error, Debug)]
pub enum WfetchError {
    /// Resolved config file does not exist
    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Runtime failed to initialize
    #[error(
        "Failed to start worker: {0}. Make sure your wrangler config file exists and is valid."
    )]
    WorkerStartFailed(String),

    /// Request did not settle within the configured window
    #[error("Request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// Request rejected by the runtime or transport
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Timeout flag could not be interpreted as seconds
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for workers-fetch operations
pub type WfetchResult<T> = Result<T, WfetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WfetchError::ConfigNotFound(PathBuf::from("missing.json"));
        assert_eq!(err.to_string(), "Config file not found: missing.json");
    }

    #[test]
    fn test_worker_start_failed_carries_hint() {
        let err = WfetchError::WorkerStartFailed("port in use".to_string());
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to start worker: port in use."));
        assert!(msg.contains("wrangler config file"));
    }

    #[test]
    fn test_timeout_display() {
        let err = WfetchError::RequestTimeout(Duration::from_millis(10));
        assert_eq!(err.to_string(), "Request timed out after 10ms");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WfetchError = io_err.into();
        assert!(matches!(err, WfetchError::Io(_)));
    }
}
