use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, instrument, warn};

use gh_client::enrich::PullRequestEnricher;
use gh_client::model::{IngestProgress, PullRequest};
use gh_client::search::PullRequestSearchClient;

use crate::cache::SnapshotCache;
use crate::model::{CachedPrSnapshot, DateRange};

/// One data-acquisition run: a fresh cached snapshot when available,
/// otherwise search, enrich, merge manual entries, and cache the result.
/// Search and enrichment errors propagate; retry and fallback flows live
/// with the caller.
pub struct PrIngestService {
    search: PullRequestSearchClient,
    enricher: PullRequestEnricher,
    cache: SnapshotCache,
    manual_pr_urls: Vec<String>,
}

impl PrIngestService {
    pub fn new(
        search: PullRequestSearchClient,
        enricher: PullRequestEnricher,
        cache: SnapshotCache,
        manual_pr_urls: Vec<String>,
    ) -> Self {
        Self {
            search,
            enricher,
            cache,
            manual_pr_urls,
        }
    }

    #[instrument(skip_all, fields(username = %username, user = %user_email))]
    pub async fn fetch_prs(
        &self,
        token: &str,
        username: &str,
        user_email: &str,
        range: &DateRange,
        mut on_progress: impl FnMut(IngestProgress),
    ) -> Result<Vec<PullRequest>> {
        if let Some(prs) = self.cache.load(user_email, range).await {
            info!(count = prs.len(), "using cached pull request snapshot");
            return Ok(prs);
        }

        let hits = self
            .search
            .search(token, username, &range.start, &range.end, &mut on_progress)
            .await?;
        let mut prs = self.enricher.enrich(token, &hits, &mut on_progress).await?;
        merge_manual_entries(&mut prs, &self.manual_pr_urls);

        let snapshot = CachedPrSnapshot {
            prs: prs.clone(),
            fetched_at: Utc::now().timestamp_millis(),
            date_range: range.clone(),
        };
        self.cache.store(user_email, snapshot).await;

        Ok(prs)
    }
}

/// Append user-pasted PR URLs as synthesized records. The canonical URL is
/// the natural key, so anything already fetched is skipped.
pub fn merge_manual_entries(prs: &mut Vec<PullRequest>, manual_urls: &[String]) {
    let mut seen: HashSet<String> = prs.iter().map(|pr| pr.url.clone()).collect();
    for url in manual_urls {
        let Some(pr) = PullRequest::from_manual_url(url) else {
            warn!(url = %url, "manual entry is not a recognizable pull request URL; skipping");
            continue;
        };
        if seen.insert(pr.url.clone()) {
            prs.push(pr);
        }
    }
}
