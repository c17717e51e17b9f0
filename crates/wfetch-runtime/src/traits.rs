//! Runtime trait definitions

use async_trait::async_trait;
use uuid::Uuid;
use wfetch_core::{RequestOptions, ResponseHead, WfetchResult, WorkerStartOptions};

/// Starts worker instances
#[async_trait]
pub trait WorkerRuntime: Send + Sync {
    /// Start a worker and wait until it can accept a request
    async fn start(&self, options: &WorkerStartOptions) -> WfetchResult<Box<dyn Worker>>;

    /// Get the runtime name
    fn name(&self) -> &'static str;
}

/// A live worker instance
#[async_trait]
pub trait Worker: Send + Sync {
    /// Identifier used in log fields
    fn id(&self) -> Uuid;

    /// Issue one request against the worker
    async fn fetch(
        &self,
        url: &str,
        request: &RequestOptions,
    ) -> WfetchResult<Box<dyn WorkerResponse>>;

    /// Tear the worker down. Must not be followed by any other call.
    async fn dispose(&mut self) -> WfetchResult<()>;
}

/// Response returned by [`Worker::fetch`]
#[async_trait]
pub trait WorkerResponse: ResponseHead + Send {
    /// Read the full body as text
    async fn text(&mut self) -> WfetchResult<String>;
}
