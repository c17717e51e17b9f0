//! Request construction: header parsing, request options and target URL

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::FetchOptions;

/// Placeholder origin; the runtime routes every request to the local worker.
pub const BASE_URL: &str = "http://example.com";

/// Header name to value
pub type HeaderMap = BTreeMap<String, String>;

/// Request descriptor handed to the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub method: String,
    pub headers: HeaderMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Parse raw `Key:Value` strings into a header map.
///
/// Only the first colon separates key from value. Entries without a colon are
/// dropped, while `Key:` yields an empty value.
pub fn parse_headers(raw: Option<&[String]>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(raw) = raw else {
        return headers;
    };

    for entry in raw {
        if let Some((key, value)) = entry.split_once(':') {
            // Only a colon in first position drops the entry; a blank key is kept.
            if key.is_empty() {
                continue;
            }
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    headers
}

/// Assemble the request descriptor; `body` is set only for non-empty data.
pub fn build_request_options(options: &FetchOptions, headers: HeaderMap) -> RequestOptions {
    let body = options.data.as_ref().filter(|d| !d.is_empty()).cloned();

    RequestOptions {
        method: options.method.clone(),
        headers,
        body,
    }
}

/// Build the absolute URL for a request path
pub fn build_url(path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", BASE_URL, path)
    } else {
        format!("{}/{}", BASE_URL, path)
    }
}
