use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use gh_client::fetcher::{HttpExec, RateLimitedFetcher};
use gh_client::RateLimitError;
use http::{Request, Response, StatusCode};

/// First call returns 403 with an exhausted rate limit resetting
/// `reset_in_secs` from now; subsequent calls succeed.
struct LimitedExec {
    reset_in_secs: i64,
    calls: AtomicUsize,
}

impl LimitedExec {
    fn new(reset_in_secs: i64) -> Self {
        Self {
            reset_in_secs,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpExec for LimitedExec {
    async fn execute(&self, _req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            let reset = Utc::now().timestamp() + self.reset_in_secs;
            return Ok(Response::builder()
                .status(StatusCode::FORBIDDEN)
                .header("x-ratelimit-remaining", "0")
                .header("x-ratelimit-reset", reset.to_string())
                .body(b"rate limit exceeded".to_vec())?);
        }
        Ok(Response::builder().status(200).body(b"ok".to_vec())?)
    }
}

fn request() -> Request<Vec<u8>> {
    Request::builder()
        .method("GET")
        .uri("https://api.github.com/search/issues?q=test")
        .body(Vec::new())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn near_reset_sleeps_and_retries_once() -> Result<()> {
    let exec = Arc::new(LimitedExec::new(5));
    let fetcher = RateLimitedFetcher::new(exec.clone());

    let started = tokio::time::Instant::now();
    let response = fetcher.fetch(request()).await?;
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(exec.calls(), 2);
    // Reset in 5s plus the one second safety margin; the reset header only
    // has second granularity, so allow up to a second of slack below.
    assert!(
        elapsed >= Duration::from_millis(4_900) && elapsed <= Duration::from_millis(6_200),
        "slept {elapsed:?}"
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn distant_reset_fails_without_sleeping() {
    let exec = Arc::new(LimitedExec::new(200));
    let fetcher = RateLimitedFetcher::new(exec.clone());

    let started = tokio::time::Instant::now();
    let err = fetcher.fetch(request()).await.expect_err("should give up");
    let elapsed = started.elapsed();

    assert_eq!(exec.calls(), 1);
    assert!(elapsed < Duration::from_secs(1), "gave up after {elapsed:?}");
    let limit_err = err.downcast_ref::<RateLimitError>().expect("rate limit error");
    assert!(limit_err.wait > Duration::from_secs(120));
}

struct PlainForbiddenExec {
    calls: AtomicUsize,
}

#[async_trait]
impl HttpExec for PlainForbiddenExec {
    async fn execute(&self, _req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response::builder()
            .status(StatusCode::FORBIDDEN)
            .body(b"forbidden".to_vec())?)
    }
}

#[tokio::test]
async fn forbidden_without_limit_headers_passes_through() -> Result<()> {
    let exec = Arc::new(PlainForbiddenExec {
        calls: AtomicUsize::new(0),
    });
    let fetcher = RateLimitedFetcher::new(exec.clone());

    let response = fetcher.fetch(request()).await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(exec.calls.load(Ordering::SeqCst), 1);
    Ok(())
}
