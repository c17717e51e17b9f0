//! Response flattening

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status line and headers of a worker response
pub trait ResponseHead {
    /// Numeric status code
    fn status(&self) -> u16;

    /// Reason phrase, empty if the runtime did not supply one
    fn status_text(&self) -> String;

    /// Header pairs in the order the runtime emitted them
    fn header_pairs(&self) -> Vec<(String, String)>;
}

/// Final output of an invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Flatten a response head and an already-read body into a [`FetchResult`].
pub fn format_response<R>(response: &R, body: String) -> FetchResult
where
    R: ResponseHead + ?Sized,
{
    let headers = response.header_pairs().into_iter().collect();

    FetchResult {
        status: response.status(),
        status_text: response.status_text(),
        headers,
        body,
    }
}
