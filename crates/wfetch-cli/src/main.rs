//! workers-fetch CLI
//!
//! Starts a local worker with `wrangler dev`, sends it one request, prints the
//! response as JSON and shuts the worker down.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wfetch_core::{parse_timeout, ConfigResolver, FetchOptions, DEFAULT_METHOD};
use wfetch_orchestrator::Orchestrator;
use wfetch_runtime::{WranglerRuntime, WranglerRuntimeConfig};

/// Send HTTP requests to Cloudflare Workers using a curl-like interface
#[derive(Parser, Debug)]
#[command(name = "workers-fetch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Request path (e.g., /api/users)
    #[arg(default_value = "/")]
    path: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = DEFAULT_METHOD)]
    method: String,

    /// Custom header, repeatable or space separated (e.g., "Content-Type:application/json")
    #[arg(short = 'H', long = "header", num_args = 1..)]
    headers: Vec<String>,

    /// Request body data
    #[arg(short, long)]
    data: Option<String>,

    /// Path to wrangler configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Path to Worker entry file (used instead of a config file)
    #[arg(short, long)]
    entry: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "3")]
    timeout: String,

    /// wrangler binary to run
    #[arg(long, env = "WORKERS_FETCH_WRANGLER", default_value = "wrangler")]
    wrangler: PathBuf,

    /// Seconds to wait for the worker to start listening
    #[arg(long, default_value = "30", value_parser = parse_seconds)]
    ready_timeout: Duration,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            method: self.method.clone(),
            header: (!self.headers.is_empty()).then(|| self.headers.clone()),
            data: self.data.clone(),
            config: self.config.clone(),
            entry: self.entry.clone(),
            timeout: Some(self.timeout.clone()),
        }
    }

    fn runtime_config(&self) -> WranglerRuntimeConfig {
        WranglerRuntimeConfig {
            wrangler_path: self.wrangler.clone(),
            ready_timeout: self.ready_timeout,
            ..WranglerRuntimeConfig::default()
        }
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    parse_timeout(raw).map_err(|e| e.to_string())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries only the response JSON.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let runtime = WranglerRuntime::new(cli.runtime_config())?;
    let resolver = ConfigResolver::from_current_dir()?;
    let orchestrator = Orchestrator::new(runtime, resolver);

    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    commands::fetch(
        &orchestrator,
        &cli.path,
        &cli.fetch_options(),
        interrupt,
        &mut std::io::stdout(),
    )
    .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", commands::error_line(&e));
            ExitCode::FAILURE
        }
    }
}
