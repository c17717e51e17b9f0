//! Caller-owned worker session

use tracing::debug;
use wfetch_core::WfetchResult;
use wfetch_runtime::Worker;

/// Lifecycle state of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has happened yet
    Idle,
    /// Computing the runtime start configuration
    Resolving,
    /// Waiting for the runtime to start
    Starting,
    /// Worker is held and no request has been issued
    Ready,
    /// Request is in flight
    Requesting,
    /// Worker is being torn down
    Disposing,
    /// Request succeeded
    Completed,
    /// Invocation failed
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Resolving => write!(f, "Resolving"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Ready => write!(f, "Ready"),
            SessionState::Requesting => write!(f, "Requesting"),
            SessionState::Disposing => write!(f, "Disposing"),
            SessionState::Completed => write!(f, "Completed"),
            SessionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Holds the worker of one invocation.
///
/// The orchestrator stores the worker here as soon as it has started, before
/// any request is issued, so the owner can always release it. The worker is
/// moved out on dispose, which makes a second dispose a no-op.
pub struct Session {
    state: SessionState,
    worker: Option<Box<dyn Worker>>,
    disposed: bool,
}

impl Session {
    /// Create an idle session
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            worker: None,
            disposed: false,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a live worker is held
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Whether a worker was held and has been disposed
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "Session transition");
        self.state = next;
    }

    pub(crate) fn attach(&mut self, worker: Box<dyn Worker>) {
        self.worker = Some(worker);
        self.transition(SessionState::Ready);
    }

    pub(crate) fn worker(&self) -> Option<&dyn Worker> {
        self.worker.as_deref()
    }

    /// Dispose the held worker, if any.
    ///
    /// Returns `true` when this call released a worker and `false` when there
    /// was nothing to release.
    pub async fn dispose(&mut self) -> WfetchResult<bool> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(false);
        };

        self.disposed = true;
        debug!(worker_id = %worker.id(), "Disposing worker");
        worker.dispose().await?;
        Ok(true)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfetch_core::{DevOptions, WorkerSource, WorkerStartOptions};
    use wfetch_runtime::testing::{StubResponse, StubRuntime};
    use wfetch_runtime::WorkerRuntime;

    #[test]
    fn test_new_session() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.has_worker());
        assert!(!session.is_disposed());
    }

    #[tokio::test]
    async fn test_dispose_without_worker() {
        let mut session = Session::new();
        assert!(!session.dispose().await.unwrap());
        assert!(!session.is_disposed());
    }

    #[tokio::test]
    async fn test_dispose_once() {
        let runtime = StubRuntime::responding(StubResponse::text("hello"));
        let calls = runtime.calls();
        let options = WorkerStartOptions {
            source: WorkerSource::Config("wrangler.json".into()),
            dev: DevOptions::default(),
            working_dir: ".".into(),
        };

        let mut session = Session::new();
        session.attach(runtime.start(&options).await.unwrap());
        assert_eq!(session.state(), SessionState::Ready);

        assert!(session.dispose().await.unwrap());
        assert!(!session.dispose().await.unwrap());
        assert!(session.is_disposed());
        assert_eq!(calls.disposals(), 1);
    }
}
