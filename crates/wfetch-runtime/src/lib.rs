//! wfetch-runtime: Worker runtime abstraction
//!
//! This crate provides the runtime used to serve a single fetch:
//! - Capability traits for runtimes, workers and responses
//! - `wrangler dev` process runtime
//! - Readiness probing for freshly spawned dev servers

pub mod process;
pub mod ready;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod traits;

pub use process::{WranglerRuntime, WranglerRuntimeConfig, WranglerWorker};
pub use ready::ReadinessProbe;
pub use traits::{Worker, WorkerResponse, WorkerRuntime};
