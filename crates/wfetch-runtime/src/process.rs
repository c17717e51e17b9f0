//! Process-based runtime implementation
//!
//! Each worker runs under `wrangler dev` as a child process bound to a free
//! loopback port. Requests are forwarded to it over HTTP.

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use wfetch_core::{
    Endpoint, RequestOptions, ResponseHead, WfetchError, WfetchResult, WorkerSource,
    WorkerStartOptions, LOCAL_HOST,
};

use crate::ready::ReadinessProbe;
use crate::traits::{Worker, WorkerResponse, WorkerRuntime};

/// Wrangler runtime configuration
#[derive(Debug, Clone)]
pub struct WranglerRuntimeConfig {
    /// Path to the wrangler binary
    pub wrangler_path: PathBuf,
    /// Additional arguments for `wrangler dev`
    pub extra_args: Vec<String>,
    /// How long to wait for the dev server to accept connections
    pub ready_timeout: Duration,
    /// How long the process group gets to exit after SIGTERM before SIGKILL
    pub shutdown_grace: Duration,
}

impl Default for WranglerRuntimeConfig {
    fn default() -> Self {
        Self {
            wrangler_path: PathBuf::from("wrangler"),
            extra_args: vec!["--show-interactive-dev-session=false".to_string()],
            ready_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Runtime that starts workers with `wrangler dev`
pub struct WranglerRuntime {
    config: WranglerRuntimeConfig,
    client: reqwest::Client,
    probe: ReadinessProbe,
}

impl WranglerRuntime {
    /// Create a new wrangler runtime
    pub fn new(config: WranglerRuntimeConfig) -> WfetchResult<Self> {
        // Redirects are reported, not followed, like curl without -L.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| WfetchError::Runtime(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            probe: ReadinessProbe::default(),
        })
    }

    /// Build the command to start a worker
    fn build_command(&self, options: &WorkerStartOptions, port: u16) -> Command {
        let mut cmd = Command::new(&self.config.wrangler_path);
        cmd.arg("dev");

        match &options.source {
            WorkerSource::Script(script) => {
                cmd.arg(script);
            }
            WorkerSource::Config(config) => {
                cmd.arg("--config").arg(config);
            }
        }

        cmd.arg("--ip").arg(LOCAL_HOST);
        cmd.arg("--port").arg(port.to_string());
        cmd.arg("--log-level").arg(options.dev.log_level.to_string());

        for arg in &self.config.extra_args {
            cmd.arg(arg);
        }

        cmd.current_dir(&options.working_dir);

        // Configure process I/O
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // wrangler forks workerd; a group lets dispose stop the whole tree.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    async fn wait_until_ready(
        &self,
        child: &mut Child,
        endpoint: &Endpoint,
        stderr_tail: &StderrTail,
    ) -> WfetchResult<()> {
        let deadline = tokio::time::Instant::now() + self.config.ready_timeout;

        loop {
            if let Some(status) = child.try_wait()? {
                let detail = stderr_tail
                    .last()
                    .map(|line| format!(": {}", line))
                    .unwrap_or_default();
                return Err(WfetchError::Runtime(format!(
                    "wrangler exited with {}{}",
                    status, detail
                )));
            }

            if self.probe.check(endpoint).await {
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(WfetchError::Runtime(format!(
                    "worker did not become ready within {:?}",
                    self.config.ready_timeout
                )));
            }

            tokio::time::sleep(self.probe.interval()).await;
        }
    }
}

#[async_trait]
impl WorkerRuntime for WranglerRuntime {
    async fn start(&self, options: &WorkerStartOptions) -> WfetchResult<Box<dyn Worker>> {
        let id = Uuid::new_v4();
        let endpoint = Endpoint::local(free_port()?);

        info!(
            worker_id = %id,
            port = endpoint.port,
            source = ?options.source,
            "Starting worker process"
        );

        let mut cmd = self.build_command(options, endpoint.port);
        let mut child = cmd.spawn().map_err(|e| {
            error!(
                worker_id = %id,
                error = %e,
                "Failed to spawn worker process"
            );
            WfetchError::Runtime(format!(
                "Failed to spawn {}: {}",
                self.config.wrangler_path.display(),
                e
            ))
        })?;

        let pgid = child.id();
        let tail = StderrTail::default();
        let drain = child
            .stderr
            .take()
            .map(|stderr| drain_stderr(id, stderr, tail.clone()));

        if let Err(e) = self.wait_until_ready(&mut child, &endpoint, &tail).await {
            warn!(worker_id = %id, error = %e, "Worker did not become ready");
            if let Err(kill_err) = terminate(&mut child, pgid, self.config.shutdown_grace).await {
                debug!(worker_id = %id, error = %kill_err, "Failed to kill worker process");
            }
            if let Some(drain) = drain {
                drain.abort();
            }
            return Err(e);
        }

        debug!(
            worker_id = %id,
            pid = pgid.unwrap_or(0),
            endpoint = %endpoint.url(),
            "Worker process ready"
        );

        Ok(Box::new(WranglerWorker {
            id,
            endpoint,
            client: self.client.clone(),
            child: Some(child),
            pgid,
            shutdown_grace: self.config.shutdown_grace,
            drain,
        }))
    }

    fn name(&self) -> &'static str {
        "wrangler"
    }
}

/// A worker served by a `wrangler dev` child process
pub struct WranglerWorker {
    id: Uuid,
    endpoint: Endpoint,
    client: reqwest::Client,
    child: Option<Child>,
    /// Process group of the dev server, recorded at spawn
    pgid: Option<u32>,
    shutdown_grace: Duration,
    drain: Option<JoinHandle<()>>,
}

#[async_trait]
impl Worker for WranglerWorker {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn fetch(
        &self,
        url: &str,
        request: &RequestOptions,
    ) -> WfetchResult<Box<dyn WorkerResponse>> {
        let target = self.endpoint.rebase(url);
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            WfetchError::RequestFailed(format!("invalid method '{}'", request.method))
        })?;

        debug!(
            worker_id = %self.id,
            method = %method,
            url = %target,
            "Forwarding request"
        );

        let mut builder = self.client.request(method, &target);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| WfetchError::RequestFailed(e.to_string()))?;

        Ok(Box::new(HttpResponse::new(response)))
    }

    async fn dispose(&mut self) -> WfetchResult<()> {
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!(
            worker_id = %self.id,
            pid = self.pgid.unwrap_or(0),
            "Stopping worker process"
        );

        // An exited leader may still have left workerd running in its group.
        if let Some(status) = child.try_wait()? {
            debug!(worker_id = %self.id, status = %status, "Worker process already exited");
        }

        terminate(&mut child, self.pgid, self.shutdown_grace)
            .await
            .map_err(|e| WfetchError::Runtime(format!("Failed to stop worker: {}", e)))
    }
}

/// Stop the dev server and everything it spawned.
///
/// The group gets SIGTERM and `grace` to exit, then SIGKILL. The leader is
/// always reaped before returning.
async fn terminate(child: &mut Child, pgid: Option<u32>, grace: Duration) -> io::Result<()> {
    #[cfg(unix)]
    {
        if let Some(pgid) = pgid {
            signal_group(pgid, libc::SIGTERM)?;
            if tokio::time::timeout(grace, child.wait()).await.is_err() {
                debug!(pgid, grace = ?grace, "Worker process ignored SIGTERM");
            }
            signal_group(pgid, libc::SIGKILL)?;
            child.wait().await?;
            return Ok(());
        }
    }

    let _ = (pgid, grace);
    if child.try_wait()?.is_none() {
        child.kill().await?;
    }
    Ok(())
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "process id out of range"))?;

    // SAFETY: kill(2) has no memory-safety preconditions.
    if unsafe { libc::kill(-pgid, signal) } == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Nothing left in the group.
        Some(libc::ESRCH) => Ok(()),
        _ => Err(err),
    }
}

/// HTTP response from a dev server
pub struct HttpResponse {
    status: u16,
    status_text: String,
    headers: Vec<(String, String)>,
    inner: Option<reqwest::Response>,
}

impl HttpResponse {
    fn new(response: reqwest::Response) -> Self {
        let status = response.status();
        // hyper only records the phrase when it differs from the canonical one.
        let status_text = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Self {
            status: status.as_u16(),
            status_text,
            headers,
            inner: Some(response),
        }
    }
}

impl ResponseHead for HttpResponse {
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
impl WorkerResponse for HttpResponse {
    async fn text(&mut self) -> WfetchResult<String> {
        let response = self.inner.take().ok_or_else(|| {
            WfetchError::RequestFailed("response body already consumed".to_string())
        })?;

        response
            .text()
            .await
            .map_err(|e| WfetchError::RequestFailed(format!("Failed to read response body: {}", e)))
    }
}

/// Last non-empty stderr line of the dev server
#[derive(Debug, Clone, Default)]
struct StderrTail(Arc<Mutex<Option<String>>>);

impl StderrTail {
    fn record(&self, line: String) {
        if let Ok(mut last) = self.0.lock() {
            *last = Some(line);
        }
    }

    fn last(&self) -> Option<String> {
        self.0.lock().ok().and_then(|last| last.clone())
    }
}

fn drain_stderr(worker_id: Uuid, stderr: ChildStderr, tail: StderrTail) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!(worker_id = %worker_id, "wrangler: {}", line);
            tail.record(line.to_string());
        }
    })
}

/// Ask the OS for an unused loopback port
fn free_port() -> WfetchResult<u16> {
    let listener = std::net::TcpListener::bind((LOCAL_HOST, 0))?;
    Ok(listener.local_addr()?.port())
}
