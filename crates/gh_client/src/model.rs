use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One merged pull request as consumed by the analysis pipeline and stored
/// in assessment documents. Serialized camelCase to match the document
/// format; GitHub wire payloads stay in their own structs below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub title: String,
    /// Canonical web URL; the natural key of a record.
    pub url: String,
    /// `owner/name`, or the literal `unknown`.
    pub repo: String,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub manual_entry: bool,
}

impl PullRequest {
    /// Synthesize a record from a pasted PR web URL. Numeric fields stay
    /// zeroed and the merge date unknown; only the URL path is trusted.
    pub fn from_manual_url(url: &str) -> Option<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        let path = trimmed.strip_prefix("https://github.com/")?;
        let mut segments = path.split('/');
        let owner = segments.next().filter(|s| !s.is_empty())?;
        let name = segments.next().filter(|s| !s.is_empty())?;
        let marker = segments.next()?;
        if marker != "pull" {
            return None;
        }
        let number: u64 = segments.next()?.parse().ok()?;

        let repo = format!("{owner}/{name}");
        Some(Self {
            title: format!("{repo}#{number}"),
            url: trimmed.to_string(),
            repo,
            merged_at: None,
            body: String::new(),
            additions: 0,
            deletions: 0,
            manual_entry: true,
        })
    }
}

/// One page of `/search/issues` results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,
    pub items: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub repository_url: String,
    pub pull_request: Option<PullRequestRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    pub url: String,
    pub merged_at: Option<DateTime<Utc>>,
}

/// Detail payload behind `pull_request.url`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestDetail {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    pub merged_at: Option<DateTime<Utc>>,
}

/// Progress for the two ingest phases. `enriched` is `None` while search
/// pages are still arriving, `Some` once enrichment batches start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    pub fetched: usize,
    pub total: usize,
    pub enriched: Option<usize>,
}

/// `owner/name` from an API repository resource URL, taken as everything
/// after the `repos/` marker.
pub fn repo_from_resource_url(url: &str) -> String {
    match url.split_once("repos/") {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_extraction_follows_marker() {
        assert_eq!(
            repo_from_resource_url("https://api.github.com/repos/acme/widgets"),
            "acme/widgets"
        );
    }

    #[test]
    fn repo_extraction_without_marker_is_unknown() {
        assert_eq!(repo_from_resource_url("https://api.github.com/"), "unknown");
    }

    #[test]
    fn manual_url_synthesis() {
        let pr = PullRequest::from_manual_url("https://github.com/acme/widgets/pull/42").unwrap();
        assert_eq!(pr.repo, "acme/widgets");
        assert_eq!(pr.title, "acme/widgets#42");
        assert_eq!(pr.additions, 0);
        assert!(pr.manual_entry);
        assert!(pr.merged_at.is_none());
    }

    #[test]
    fn manual_url_rejects_non_pr_paths() {
        assert!(PullRequest::from_manual_url("https://github.com/acme/widgets/issues/7").is_none());
        assert!(PullRequest::from_manual_url("https://example.com/acme/widgets/pull/7").is_none());
    }
}
