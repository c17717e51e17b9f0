//! In-memory test doubles for the runtime traits

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use wfetch_core::{RequestOptions, ResponseHead, WfetchError, WfetchResult, WorkerStartOptions};

use crate::traits::{Worker, WorkerResponse, WorkerRuntime};

/// Canned response
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    /// `200 OK` with a `text/plain` body
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: body.into(),
        }
    }
}

impl ResponseHead for StubResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn status_text(&self) -> String {
        self.status_text.clone()
    }

    fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers.clone()
    }
}

#[async_trait]
impl WorkerResponse for StubResponse {
    async fn text(&mut self) -> WfetchResult<String> {
        Ok(self.body.clone())
    }
}

/// What a stub worker does when fetched
#[derive(Debug, Clone)]
pub enum FetchBehavior {
    /// Return the response
    Respond(StubResponse),
    /// Fail with [`WfetchError::RequestFailed`]
    Fail(String),
    /// Never settle
    Hang,
}

/// Calls observed by a [`StubRuntime`] and its workers
#[derive(Debug, Default)]
pub struct StubCalls {
    starts: AtomicUsize,
    fetches: AtomicUsize,
    disposals: AtomicUsize,
    last_start: Mutex<Option<WorkerStartOptions>>,
    last_request: Mutex<Option<(String, RequestOptions)>>,
}

impl StubCalls {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    /// Options of the most recent start call
    pub fn last_start(&self) -> Option<WorkerStartOptions> {
        self.last_start.lock().ok().and_then(|s| s.clone())
    }

    /// URL and descriptor of the most recent fetch
    pub fn last_request(&self) -> Option<(String, RequestOptions)> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

/// Runtime double with scripted start and fetch outcomes
#[derive(Debug, Clone)]
pub struct StubRuntime {
    start_error: Option<String>,
    start_delay: Duration,
    fetch: FetchBehavior,
    calls: Arc<StubCalls>,
}

impl StubRuntime {
    /// Runtime whose workers answer with `response`
    pub fn responding(response: StubResponse) -> Self {
        Self::with_behavior(FetchBehavior::Respond(response))
    }

    /// Runtime whose workers behave as given
    pub fn with_behavior(fetch: FetchBehavior) -> Self {
        Self {
            start_error: None,
            start_delay: Duration::ZERO,
            fetch,
            calls: Arc::new(StubCalls::default()),
        }
    }

    /// Runtime whose start call fails
    pub fn failing_start(message: impl Into<String>) -> Self {
        Self {
            start_error: Some(message.into()),
            ..Self::with_behavior(FetchBehavior::Hang)
        }
    }

    /// Delay start by the given duration
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Shared call counters
    pub fn calls(&self) -> Arc<StubCalls> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl WorkerRuntime for StubRuntime {
    async fn start(&self, options: &WorkerStartOptions) -> WfetchResult<Box<dyn Worker>> {
        self.calls.starts.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.calls.last_start.lock() {
            *last = Some(options.clone());
        }

        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }

        if let Some(message) = &self.start_error {
            return Err(WfetchError::Runtime(message.clone()));
        }

        Ok(Box::new(StubWorker {
            id: Uuid::new_v4(),
            fetch: self.fetch.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Worker created by [`StubRuntime`]
pub struct StubWorker {
    id: Uuid,
    fetch: FetchBehavior,
    calls: Arc<StubCalls>,
}

#[async_trait]
impl Worker for StubWorker {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn fetch(
        &self,
        url: &str,
        request: &RequestOptions,
    ) -> WfetchResult<Box<dyn WorkerResponse>> {
        self.calls.fetches.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.calls.last_request.lock() {
            *last = Some((url.to_string(), request.clone()));
        }

        match &self.fetch {
            FetchBehavior::Respond(response) => Ok(Box::new(response.clone())),
            FetchBehavior::Fail(message) => Err(WfetchError::RequestFailed(message.clone())),
            FetchBehavior::Hang => std::future::pending().await,
        }
    }

    async fn dispose(&mut self) -> WfetchResult<()> {
        self.calls.disposals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
