//! Readiness checking for a freshly spawned dev server

use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, trace};
use wfetch_core::Endpoint;

/// Polls a worker endpoint until it accepts connections.
///
/// A TCP connect is used instead of an HTTP request so the worker's own
/// handler never sees a probe request.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    /// Delay between attempts
    interval: Duration,
    /// Per-attempt connect timeout
    connect_timeout: Duration,
}

impl ReadinessProbe {
    /// Create a new probe
    pub fn new(interval: Duration, connect_timeout: Duration) -> Self {
        Self {
            interval,
            connect_timeout,
        }
    }

    /// Check whether the endpoint accepts a connection right now
    pub async fn check(&self, endpoint: &Endpoint) -> bool {
        let addr = (endpoint.host.as_str(), endpoint.port);
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => {
                debug!(endpoint = %endpoint.url(), "Readiness check passed");
                true
            }
            Ok(Err(e)) => {
                trace!(endpoint = %endpoint.url(), error = %e, "Endpoint not ready");
                false
            }
            Err(_) => {
                trace!(endpoint = %endpoint.url(), "Readiness check timed out");
                false
            }
        }
    }

    /// Get the delay between attempts
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_probe_creation() {
        let probe = ReadinessProbe::new(Duration::from_millis(50), Duration::from_secs(1));
        assert_eq!(probe.interval(), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_check_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = ReadinessProbe::default();
        assert!(probe.check(&Endpoint::local(port)).await);
    }

    #[tokio::test]
    async fn test_check_closed_port() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = ReadinessProbe::default();
        assert!(!probe.check(&Endpoint::local(port)).await);
    }
}
