//! CLI commands implementation

use anyhow::Result;
use std::future::Future;
use std::io::Write;
use tracing::{debug, warn};
use wfetch_core::FetchOptions;
use wfetch_orchestrator::{Orchestrator, Session};
use wfetch_runtime::WorkerRuntime;

/// Send one request through a fresh worker and print the result as JSON.
///
/// If `interrupt` completes first the request is abandoned and the worker is
/// still disposed. Nothing is written to `out` unless the request succeeds.
pub async fn fetch<R, F>(
    orchestrator: &Orchestrator<R>,
    path: &str,
    options: &FetchOptions,
    interrupt: F,
    out: &mut impl Write,
) -> Result<()>
where
    R: WorkerRuntime,
    F: Future<Output = ()>,
{
    let mut session = Session::new();

    let outcome = tokio::select! {
        biased;
        outcome = orchestrator.send_request(&mut session, path, options) => {
            outcome.map_err(anyhow::Error::from)
        }
        _ = interrupt => Err(anyhow::anyhow!("Interrupted")),
    };

    // No-op when the orchestrator already released the worker.
    if let Err(e) = session.dispose().await {
        warn!(error = %e, "Failed to dispose worker");
    }
    debug!(
        state = %session.state(),
        disposed = session.is_disposed(),
        "Session finished"
    );

    let result = outcome?;
    let json = serde_json::to_string_pretty(&result)?;
    writeln!(out, "{}", json)?;

    Ok(())
}

/// Format an error for the diagnostic stream
pub fn error_line(err: &anyhow::Error) -> String {
    format!("Error: {}", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use wfetch_core::ConfigResolver;
    use wfetch_runtime::testing::{FetchBehavior, StubResponse, StubRuntime};

    fn project_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wrangler.json"), "{}").unwrap();
        dir
    }

    fn never() -> std::future::Pending<()> {
        std::future::pending()
    }

    #[tokio::test]
    async fn test_fetch_prints_json() {
        let dir = project_dir();
        let runtime = StubRuntime::responding(StubResponse::text("hello"));
        let calls = runtime.calls();
        let orchestrator = Orchestrator::new(runtime, ConfigResolver::new(dir.path()));

        let mut out = Vec::new();
        fetch(&orchestrator, "/", &FetchOptions::default(), never(), &mut out)
            .await
            .unwrap();

        let printed = String::from_utf8(out).unwrap();
        let value: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "status": 200,
                "statusText": "OK",
                "headers": {"content-type": "text/plain"},
                "body": "hello"
            })
        );
        assert!(printed.starts_with("{\n  \"status\": 200"));
        assert_eq!(calls.disposals(), 1);
    }

    #[tokio::test]
    async fn test_fetch_missing_config() {
        let dir = project_dir();
        let runtime = StubRuntime::responding(StubResponse::text("hello"));
        let calls = runtime.calls();
        let orchestrator = Orchestrator::new(runtime, ConfigResolver::new(dir.path()));

        let options = FetchOptions {
            config: Some("missing.json".to_string()),
            ..FetchOptions::default()
        };
        let mut out = Vec::new();
        let err = fetch(&orchestrator, "/", &options, never(), &mut out)
            .await
            .unwrap_err();

        assert!(error_line(&err).starts_with("Error: "));
        assert!(error_line(&err).contains("missing.json"));
        assert!(out.is_empty());
        assert_eq!(calls.starts(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_prints_nothing() {
        let dir = project_dir();
        let runtime = StubRuntime::with_behavior(FetchBehavior::Fail("worker threw".into()));
        let calls = runtime.calls();
        let orchestrator = Orchestrator::new(runtime, ConfigResolver::new(dir.path()));

        let mut out = Vec::new();
        let err = fetch(&orchestrator, "/", &FetchOptions::default(), never(), &mut out)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Request failed: worker threw");
        assert!(out.is_empty());
        assert_eq!(calls.disposals(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_disposes_worker() {
        let dir = project_dir();
        let runtime = StubRuntime::with_behavior(FetchBehavior::Hang);
        let calls = runtime.calls();
        let orchestrator = Orchestrator::new(runtime, ConfigResolver::new(dir.path()));

        let mut out = Vec::new();
        let err = fetch(
            &orchestrator,
            "/",
            &FetchOptions::default(),
            std::future::ready(()),
            &mut out,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Interrupted");
        assert_eq!(calls.starts(), 1);
        assert_eq!(calls.disposals(), 1);
        assert!(out.is_empty());
    }
}
