//! Request orchestration: start a worker, send one request, dispose the worker

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use wfetch_core::{
    build_request_options, build_url, format_response, parse_headers, ConfigResolver,
    FetchOptions, FetchResult, WfetchError, WfetchResult,
};
use wfetch_runtime::WorkerRuntime;

use crate::session::{Session, SessionState};

/// Startups at least this slow get a progress line on stderr
pub const STARTUP_NOTICE_THRESHOLD: Duration = Duration::from_millis(1000);

/// Optional behaviors of the orchestration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorFeatures {
    /// Honor `entry` by starting from a script
    pub entry_script: bool,
    /// Bound the request by the configured timeout
    pub timeout: bool,
    /// Check config files exist before starting the runtime
    pub validate_config: bool,
    /// Report slow startups on stderr
    pub startup_notice: bool,
}

impl Default for OrchestratorFeatures {
    fn default() -> Self {
        Self {
            entry_script: true,
            timeout: true,
            validate_config: true,
            startup_notice: true,
        }
    }
}

/// Drives one request through a worker's lifecycle
pub struct Orchestrator<R> {
    runtime: R,
    resolver: ConfigResolver,
    features: OrchestratorFeatures,
}

impl<R: WorkerRuntime> Orchestrator<R> {
    /// Create an orchestrator with all features enabled
    pub fn new(runtime: R, resolver: ConfigResolver) -> Self {
        Self {
            runtime,
            resolver,
            features: OrchestratorFeatures::default(),
        }
    }

    /// Select optional behaviors
    pub fn with_features(mut self, features: OrchestratorFeatures) -> Self {
        self.resolver = self.resolver.with_entry_support(features.entry_script);
        self.features = features;
        self
    }

    /// Start a worker, send the request and dispose the worker.
    ///
    /// The worker is stored in `session` before the request is issued and is
    /// disposed before this returns, whatever the outcome.
    pub async fn send_request(
        &self,
        session: &mut Session,
        path: &str,
        options: &FetchOptions,
    ) -> WfetchResult<FetchResult> {
        let outcome = self.execute(session, path, options).await;

        if session.has_worker() {
            session.transition(SessionState::Disposing);
            if let Err(e) = session.dispose().await {
                warn!(error = %e, "Failed to dispose worker");
            }
        }

        match &outcome {
            Ok(result) => {
                info!(status = result.status, "Request completed");
                session.transition(SessionState::Completed);
            }
            Err(e) => {
                debug!(error = %e, "Request failed");
                session.transition(SessionState::Failed);
            }
        }

        outcome
    }

    async fn execute(
        &self,
        session: &mut Session,
        path: &str,
        options: &FetchOptions,
    ) -> WfetchResult<FetchResult> {
        // Parsed up front so a bad value never costs a runtime start.
        let timeout = self.request_timeout(options)?;
        self.acquire(session, options).await?;
        self.perform(session, path, options, timeout).await
    }

    /// Resolve the start configuration and start a worker into `session`.
    pub async fn acquire(&self, session: &mut Session, options: &FetchOptions) -> WfetchResult<()> {
        session.transition(SessionState::Resolving);
        let start = self.resolver.resolve(options);
        if self.features.validate_config {
            self.resolver.validate(&start)?;
        }

        session.transition(SessionState::Starting);
        let started_at = Instant::now();
        let worker = self
            .runtime
            .start(&start)
            .await
            .map_err(|e| WfetchError::WorkerStartFailed(e.to_string()))?;
        let elapsed = started_at.elapsed();

        info!(
            worker_id = %worker.id(),
            runtime = self.runtime.name(),
            elapsed = ?elapsed,
            "Worker started"
        );
        session.attach(worker);

        if self.features.startup_notice {
            if let Some(notice) = startup_notice(elapsed) {
                eprintln!("{}", notice);
            }
        }

        Ok(())
    }

    /// Send the request to the worker held by `session`.
    pub async fn run(
        &self,
        session: &mut Session,
        path: &str,
        options: &FetchOptions,
    ) -> WfetchResult<FetchResult> {
        let timeout = self.request_timeout(options)?;
        self.perform(session, path, options, timeout).await
    }

    async fn perform(
        &self,
        session: &mut Session,
        path: &str,
        options: &FetchOptions,
        timeout: Option<Duration>,
    ) -> WfetchResult<FetchResult> {
        if !session.has_worker() {
            return Err(WfetchError::Internal(
                "no worker has been started for this session".to_string(),
            ));
        }

        let headers = parse_headers(options.header.as_deref());
        let request = build_request_options(options, headers);
        let url = build_url(path);

        session.transition(SessionState::Requesting);
        let worker = session.worker().ok_or_else(|| {
            WfetchError::Internal("worker released during request".to_string())
        })?;

        debug!(
            worker_id = %worker.id(),
            method = %request.method,
            url = %url,
            timeout = ?timeout,
            "Sending request"
        );

        let response = match timeout {
            // The losing fetch future is dropped here and never polled again.
            Some(limit) => match tokio::time::timeout(limit, worker.fetch(&url, &request)).await {
                Ok(response) => response,
                Err(_) => {
                    warn!(worker_id = %worker.id(), timeout = ?limit, "Request timed out");
                    return Err(WfetchError::RequestTimeout(limit));
                }
            },
            None => worker.fetch(&url, &request).await,
        };

        let mut response = response.map_err(request_failed)?;
        let body = response.text().await.map_err(request_failed)?;

        Ok(format_response(&*response, body))
    }

    fn request_timeout(&self, options: &FetchOptions) -> WfetchResult<Option<Duration>> {
        if self.features.timeout {
            options.timeout_duration().map(Some)
        } else {
            Ok(None)
        }
    }
}

fn request_failed(err: WfetchError) -> WfetchError {
    match err {
        WfetchError::RequestFailed(_) | WfetchError::RequestTimeout(_) => err,
        other => WfetchError::RequestFailed(other.to_string()),
    }
}

/// Progress line for a startup that took `elapsed`, if it was slow enough
pub fn startup_notice(elapsed: Duration) -> Option<String> {
    (elapsed >= STARTUP_NOTICE_THRESHOLD)
        .then(|| format!("Worker started in {:.1}s", elapsed.as_secs_f64()))
}
