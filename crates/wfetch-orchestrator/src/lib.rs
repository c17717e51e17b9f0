//! wfetch-orchestrator: Single-request worker orchestration
//!
//! This crate sequences one invocation:
//! - Runtime configuration resolution and validation
//! - Worker startup into a caller-owned session
//! - Timeout-bounded request execution
//! - Guaranteed, single disposal of the worker

pub mod orchestrator;
pub mod session;

pub use orchestrator::{Orchestrator, OrchestratorFeatures, STARTUP_NOTICE_THRESHOLD};
pub use session::{Session, SessionState};
