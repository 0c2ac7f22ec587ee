use std::sync::Arc;

use anyhow::Result;
use futures::future;
use http::{header, Request};
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::fetcher::{HttpExec, RateLimitedFetcher};
use crate::metrics;
use crate::model::{
    repo_from_resource_url, IngestProgress, PullRequest, PullRequestDetail, SearchHit,
};

/// Detail requests issued concurrently per batch. The next batch starts only
/// once the whole previous batch has settled.
pub const ENRICH_BATCH_SIZE: usize = 5;

/// Turns raw search hits into [`PullRequest`] records, folding in precise
/// addition/deletion counts and the authoritative merge timestamp from the
/// per-item detail endpoint. Detail failures degrade to search-hit data and
/// never fail the batch.
pub struct PullRequestEnricher {
    fetcher: RateLimitedFetcher,
    user_agent: String,
}

impl PullRequestEnricher {
    pub fn new(exec: Arc<dyn HttpExec>, user_agent: String) -> Self {
        Self {
            fetcher: RateLimitedFetcher::new(exec),
            user_agent,
        }
    }

    #[instrument(skip_all, fields(hits = hits.len()))]
    pub async fn enrich(
        &self,
        token: &str,
        hits: &[SearchHit],
        mut on_progress: impl FnMut(IngestProgress),
    ) -> Result<Vec<PullRequest>> {
        let total = hits.len();
        let mut prs = Vec::with_capacity(total);

        for batch in hits.chunks(ENRICH_BATCH_SIZE) {
            let enriched =
                future::join_all(batch.iter().map(|hit| self.enrich_one(token, hit))).await;
            prs.extend(enriched);
            on_progress(IngestProgress {
                fetched: total,
                total,
                enriched: Some(prs.len()),
            });
        }

        Ok(prs)
    }

    async fn enrich_one(&self, token: &str, hit: &SearchHit) -> PullRequest {
        let fallback_merged = hit
            .pull_request
            .as_ref()
            .and_then(|pr| pr.merged_at)
            .or(hit.closed_at);
        let mut pr = PullRequest {
            title: hit.title.clone(),
            url: hit.html_url.clone(),
            repo: repo_from_resource_url(&hit.repository_url),
            merged_at: fallback_merged,
            body: hit.body.clone().unwrap_or_default(),
            additions: 0,
            deletions: 0,
            manual_entry: false,
        };

        let Some(detail_url) = hit.pull_request.as_ref().map(|p| p.url.as_str()) else {
            return pr;
        };

        match self.fetch_detail(token, detail_url).await {
            Ok(detail) => {
                pr.additions = detail.additions;
                pr.deletions = detail.deletions;
                if detail.merged_at.is_some() {
                    pr.merged_at = detail.merged_at;
                }
            }
            Err(err) => {
                metrics::ENRICH_FAILURES_TOTAL.inc();
                warn!(
                    url = %pr.url,
                    error = %err,
                    "pull request detail fetch failed; keeping search data"
                );
            }
        }

        pr
    }

    async fn fetch_detail(&self, token: &str, url: &str) -> Result<PullRequestDetail> {
        let uri: http::Uri = url.parse()?;
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::USER_AGENT, self.user_agent.clone())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("X-GitHub-Api-Version", "2022-11-28")
            .body(Vec::new())?;

        let response = self.fetcher.fetch(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(status, url, response.body()).into());
        }
        Ok(serde_json::from_slice(response.body())?)
    }
}
