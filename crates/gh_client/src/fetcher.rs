use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use http::{HeaderMap, Request, Response, StatusCode};
use tokio::time::sleep;
use tracing::warn;

use crate::error::RateLimitError;
use crate::metrics;

/// Longest reset window we will sleep through before giving up.
const MAX_RESET_WAIT: Duration = Duration::from_millis(120_000);

#[async_trait]
pub trait HttpExec: Send + Sync {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>>;
}

pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl Default for ReqwestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("review-prep-lab")
            .build()
            .expect("reqwest client");
        Self { client }
    }
}

#[async_trait]
impl HttpExec for ReqwestExecutor {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let (parts, body) = req.into_parts();
        let mut builder = self.client.request(parts.method, parts.uri.to_string());
        builder = builder.headers(parts.headers);
        let resp = builder.body(body).send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        let mut builder = Response::builder().status(status);
        *builder.headers_mut().unwrap() = headers;
        Ok(builder.body(bytes.to_vec())?)
    }
}

/// Plain HTTP call surface that recovers from primary rate limiting: a 403
/// with an exhausted `x-ratelimit-remaining` sleeps until the advertised
/// reset and retries exactly once. Everything else passes through untouched.
pub struct RateLimitedFetcher {
    exec: Arc<dyn HttpExec>,
}

impl RateLimitedFetcher {
    pub fn new(exec: Arc<dyn HttpExec>) -> Self {
        Self { exec }
    }

    pub async fn fetch(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let retry = clone_request(&req);
        let resp = self.exec.execute(req).await?;
        if resp.status() != StatusCode::FORBIDDEN {
            return Ok(resp);
        }

        let Some(wait_ms) = reset_wait_ms(resp.headers(), Utc::now().timestamp_millis()) else {
            // 403 without exhausted-limit signaling is the caller's problem.
            return Ok(resp);
        };

        if wait_ms <= 0 || wait_ms >= MAX_RESET_WAIT.as_millis() as i64 {
            metrics::RATE_LIMIT_GIVEUPS_TOTAL.inc();
            return Err(RateLimitError {
                wait: Duration::from_millis(wait_ms.max(0) as u64),
            }
            .into());
        }

        let wait = Duration::from_millis(wait_ms as u64);
        warn!(
            wait_ms,
            uri = %retry.uri(),
            "primary rate limit exhausted; sleeping until reset"
        );
        metrics::RATE_LIMIT_SLEEP_SECONDS.inc_by(wait.as_secs());
        sleep(wait).await;
        // Single retry; whatever it returns is final.
        self.exec.execute(retry).await
    }
}

/// Milliseconds until one second past the advertised reset. `None` when the
/// response does not look like an exhausted primary rate limit.
fn reset_wait_ms(headers: &HeaderMap, now_ms: i64) -> Option<i64> {
    let remaining = header_i64(headers, "x-ratelimit-remaining")?;
    if remaining != 0 {
        return None;
    }
    let reset = header_i64(headers, "x-ratelimit-reset")?;
    Some(reset * 1000 - now_ms + 1000)
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
}

fn clone_request(req: &Request<Vec<u8>>) -> Request<Vec<u8>> {
    let mut builder = Request::builder()
        .method(req.method().clone())
        .uri(req.uri().clone())
        .version(req.version());

    for (key, value) in req.headers().iter() {
        builder = builder.header(key, value);
    }

    builder.body(req.body().clone()).expect("request rebuild")
}
