use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use common::text::truncate;

/// Non-success response from the GitHub API, carrying enough of the body to
/// diagnose the failure without logging whole payloads.
#[derive(Debug, Error)]
#[error("github api error: {status} for {endpoint}: {body_preview}")]
pub struct ApiError {
    pub status: StatusCode,
    pub endpoint: String,
    pub body_preview: String,
}

impl ApiError {
    pub fn new(status: StatusCode, endpoint: impl Into<String>, body: &[u8]) -> Self {
        Self {
            status,
            endpoint: endpoint.into(),
            body_preview: truncate(&String::from_utf8_lossy(body), 256),
        }
    }
}

/// The primary rate limit is exhausted and the advertised reset falls
/// outside the window we are willing to sleep through.
#[derive(Debug, Error)]
#[error("rate limit exhausted; advertised reset is {} ms away, outside the single-retry window", wait.as_millis())]
pub struct RateLimitError {
    pub wait: Duration,
}
