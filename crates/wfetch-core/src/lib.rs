//! wfetch-core: Core types for workers-fetch
//!
//! This crate provides the pieces of a single fetch invocation that do not
//! touch the worker runtime:
//! - Request options and timeout parsing
//! - Header parsing, request descriptor and URL construction
//! - Response flattening
//! - Runtime start configuration resolution
//! - Error handling

pub mod config;
pub mod endpoint;
pub mod error;
pub mod options;
pub mod request;
pub mod response;

pub use config::*;
pub use endpoint::*;
pub use error::*;
pub use options::*;
pub use request::*;
pub use response::*;
