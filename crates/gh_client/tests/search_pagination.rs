use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use gh_client::fetcher::HttpExec;
use gh_client::search::PullRequestSearchClient;
use http::{Request, Response};
use serde_json::json;

fn hit(i: usize) -> serde_json::Value {
    json!({
        "title": format!("Add widget {i}"),
        "html_url": format!("https://github.com/acme/widgets/pull/{i}"),
        "body": "change description",
        "closed_at": "2025-03-01T12:00:00Z",
        "repository_url": "https://api.github.com/repos/acme/widgets",
        "pull_request": {
            "url": format!("https://api.github.com/repos/acme/widgets/pulls/{i}"),
            "merged_at": "2025-03-01T12:00:00Z"
        }
    })
}

/// Serves scripted search pages, tracking how many requests arrive.
struct PagedExec {
    total_count: u64,
    page_sizes: Vec<usize>,
    calls: AtomicUsize,
}

impl PagedExec {
    fn new(total_count: u64, page_sizes: Vec<usize>) -> Self {
        Self {
            total_count,
            page_sizes,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpExec for PagedExec {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page: usize = req
            .uri()
            .query()
            .unwrap_or("")
            .split('&')
            .find_map(|kv| kv.strip_prefix("page="))
            .expect("page param")
            .parse()
            .expect("numeric page");

        let size = self.page_sizes[page - 1];
        let start: usize = self.page_sizes[..page - 1].iter().sum();
        let items: Vec<_> = (start..start + size).map(hit).collect();
        let body = serde_json::to_vec(&json!({
            "total_count": self.total_count,
            "items": items,
        }))?;
        Ok(Response::builder().status(200).body(body)?)
    }
}

fn client(exec: Arc<dyn HttpExec>) -> PullRequestSearchClient {
    PullRequestSearchClient::new(exec, "test-agent".into())
}

#[tokio::test]
async fn pages_until_reported_total_is_reached() -> Result<()> {
    let exec = Arc::new(PagedExec::new(250, vec![100, 100, 50]));
    let search = client(exec.clone());

    let mut progress = Vec::new();
    let hits = search
        .search("tok", "octocat", "2025-01-01", "2025-06-30", |p| {
            progress.push((p.fetched, p.total))
        })
        .await?;

    assert_eq!(exec.calls(), 3);
    assert_eq!(hits.len(), 250);
    assert_eq!(progress, vec![(100, 250), (200, 250), (250, 250)]);
    Ok(())
}

#[tokio::test]
async fn short_page_overrides_stated_total() -> Result<()> {
    let exec = Arc::new(PagedExec::new(300, vec![40]));
    let search = client(exec.clone());

    let mut progress = Vec::new();
    let hits = search
        .search("tok", "octocat", "2025-01-01", "2025-06-30", |p| {
            progress.push((p.fetched, p.total))
        })
        .await?;

    assert_eq!(exec.calls(), 1);
    assert_eq!(hits.len(), 40);
    assert_eq!(progress, vec![(40, 300)]);
    Ok(())
}

#[tokio::test]
async fn empty_result_set_terminates_after_one_page() -> Result<()> {
    let exec = Arc::new(PagedExec::new(0, vec![0]));
    let search = client(exec.clone());

    let hits = search
        .search("tok", "octocat", "2025-01-01", "2025-06-30", |_| {})
        .await?;

    assert_eq!(exec.calls(), 1);
    assert!(hits.is_empty());
    Ok(())
}

struct FailingExec;

#[async_trait]
impl HttpExec for FailingExec {
    async fn execute(&self, _req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        Ok(Response::builder()
            .status(500)
            .body(b"search backend unavailable".to_vec())?)
    }
}

#[tokio::test]
async fn non_success_response_aborts_with_status_and_body() {
    let search = client(Arc::new(FailingExec));

    let err = search
        .search("tok", "octocat", "2025-01-01", "2025-06-30", |_| {})
        .await
        .expect_err("search should fail");

    let api_err = err
        .downcast_ref::<gh_client::ApiError>()
        .expect("api error");
    assert_eq!(api_err.status.as_u16(), 500);
    assert!(api_err.body_preview.contains("search backend unavailable"));
}
