//! Network endpoint of a local worker

use serde::{Deserialize, Serialize};

/// Loopback address the dev server binds to
pub const LOCAL_HOST: &str = "127.0.0.1";

/// Network endpoint for a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Loopback endpoint on the given port
    pub fn local(port: u16) -> Self {
        Self::new(LOCAL_HOST, port)
    }

    /// Get the URL for this endpoint
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Re-target an absolute URL at this endpoint, keeping path and query.
    pub fn rebase(&self, url: &str) -> String {
        let path = url
            .split_once("://")
            .map(|(_, rest)| rest.find('/').map(|i| &rest[i..]).unwrap_or("/"))
            .unwrap_or(url);
        format!("{}{}", self.url(), path)
    }
}
