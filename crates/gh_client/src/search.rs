use std::sync::Arc;

use anyhow::Result;
use http::{header, Request};
use tracing::{debug, instrument};
use url::Url;

use crate::error::ApiError;
use crate::fetcher::{HttpExec, RateLimitedFetcher};
use crate::metrics;
use crate::model::{IngestProgress, SearchHit, SearchPage};

pub const SEARCH_PAGE_SIZE: u32 = 100;

/// Pages through `/search/issues` for a user's merged pull requests.
pub struct PullRequestSearchClient {
    fetcher: RateLimitedFetcher,
    base: Url,
    user_agent: String,
}

impl PullRequestSearchClient {
    pub fn new(exec: Arc<dyn HttpExec>, user_agent: String) -> Self {
        Self::with_base(
            exec,
            user_agent,
            Url::parse("https://api.github.com/").expect("valid base url"),
        )
    }

    pub fn with_base(exec: Arc<dyn HttpExec>, user_agent: String, base: Url) -> Self {
        Self {
            fetcher: RateLimitedFetcher::new(exec),
            base,
            user_agent,
        }
    }

    /// Accumulate every merged PR of `username` in the inclusive date range.
    ///
    /// The total count is read from the first page and held fixed; a page
    /// returning fewer than [`SEARCH_PAGE_SIZE`] items ends the loop
    /// regardless, guarding against total-count drift between pages.
    #[instrument(skip(self, token, on_progress), fields(username = %username))]
    pub async fn search(
        &self,
        token: &str,
        username: &str,
        start_date: &str,
        end_date: &str,
        mut on_progress: impl FnMut(IngestProgress),
    ) -> Result<Vec<SearchHit>> {
        let query = format!("author:{username} is:pr is:merged merged:{start_date}..{end_date}");
        let mut hits: Vec<SearchHit> = Vec::new();
        let mut total = 0usize;
        let mut page = 1u32;

        loop {
            let url = self.page_url(&query, page)?;
            debug!(page, url = %url, "fetching search page");
            let request = self.request(token, &url)?;
            let response = self.fetcher.fetch(request).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::new(status, url.path(), response.body()).into());
            }

            let parsed: SearchPage = serde_json::from_slice(response.body())?;
            if page == 1 {
                total = parsed.total_count as usize;
            }
            let received = parsed.items.len();
            hits.extend(parsed.items);
            metrics::SEARCH_PAGES_TOTAL.inc();
            metrics::SEARCH_HITS_TOTAL.inc_by(received as u64);

            on_progress(IngestProgress {
                fetched: hits.len(),
                total,
                enriched: None,
            });

            if hits.len() >= total || received < SEARCH_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        Ok(hits)
    }

    fn page_url(&self, query: &str, page: u32) -> Result<Url> {
        let mut url = self.base.join("search/issues")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("per_page", &SEARCH_PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("sort", "updated")
            .append_pair("order", "desc");
        Ok(url)
    }

    fn request(&self, token: &str, url: &Url) -> Result<Request<Vec<u8>>> {
        let uri: http::Uri = url.as_str().parse()?;
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::USER_AGENT, self.user_agent.clone())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("X-GitHub-Api-Version", "2022-11-28")
            .body(Vec::new())?;
        Ok(request)
    }
}
