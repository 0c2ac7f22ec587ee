use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use gh_client::model::PullRequest;

/// A model-inferred grouping of pull requests representing one coherent
/// project or work stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Unique within one pipeline run, caller-visible.
    pub id: String,
    pub name: String,
    pub summary: String,
    pub prs: Vec<PullRequest>,
}

/// How strongly a cluster satisfies a rubric category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    Medium,
    Low,
}

impl Relevance {
    /// Coerce an untrusted tier string. Anything unrecognized lands on Low.
    pub fn from_untrusted(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            other => {
                warn!(tier = %other, "unknown relevance tier; defaulting to low");
                Self::Low
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAssignment {
    pub category_id: String,
    pub relevance: Relevance,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMapping {
    pub cluster_id: String,
    pub categories: Vec<CategoryAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Derived as `<clusterId>-q<n>`, 1-based.
    pub id: String,
    pub text: String,
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub cluster_id: String,
    pub questions: Vec<Question>,
}

/// Top-level persisted aggregate, exclusively owned by one user and replaced
/// whole on every pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub user_email: String,
    pub clusters: Vec<Cluster>,
    pub mappings: Vec<CategoryMapping>,
    pub questions: Vec<QuestionSet>,
    pub narrative: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Clustering-stage element as produced by the model. Treated as untrusted
/// input; indices are resolved and validated before use.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCluster {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub pr_indices: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMapping {
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub categories: Vec<RawAssignment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssignment {
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub relevance: String,
    #[serde(default)]
    pub evidence: String,
}

/// Question-stage element; any id the model proposes is discarded.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Cached result of one ingest run, held in the in-process cache and
/// mirrored to the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPrSnapshot {
    pub prs: Vec<PullRequest>,
    /// Epoch milliseconds.
    pub fetched_at: i64,
    pub date_range: DateRange,
}

impl CachedPrSnapshot {
    pub const MAX_AGE_MS: i64 = 24 * 60 * 60 * 1000;

    /// Fresh iff fetched within the last 24 hours for exactly the requested
    /// range. Range equality is string comparison, not semantic dates.
    pub fn is_fresh(&self, now_ms: i64, range: &DateRange) -> bool {
        now_ms - self.fetched_at <= Self::MAX_AGE_MS && self.date_range == *range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange {
            start: "2025-01-01".into(),
            end: "2025-06-30".into(),
        }
    }

    fn snapshot(fetched_at: i64) -> CachedPrSnapshot {
        CachedPrSnapshot {
            prs: Vec::new(),
            fetched_at,
            date_range: range(),
        }
    }

    #[test]
    fn snapshot_just_past_max_age_is_stale() {
        let now = 10_000_000_000;
        let snap = snapshot(now - CachedPrSnapshot::MAX_AGE_MS - 1_000);
        assert!(!snap.is_fresh(now, &range()));
    }

    #[test]
    fn snapshot_within_max_age_is_fresh() {
        let now = 10_000_000_000;
        let snap = snapshot(now - 23 * 60 * 60 * 1000);
        assert!(snap.is_fresh(now, &range()));
    }

    #[test]
    fn snapshot_exactly_at_max_age_is_fresh() {
        let now = 10_000_000_000;
        let snap = snapshot(now - CachedPrSnapshot::MAX_AGE_MS);
        assert!(snap.is_fresh(now, &range()));
    }

    #[test]
    fn mismatched_range_is_stale() {
        let now = 10_000_000_000;
        let snap = snapshot(now - 1_000);
        let other = DateRange {
            start: "2025-01-02".into(),
            end: "2025-06-30".into(),
        };
        assert!(!snap.is_fresh(now, &other));
    }

    #[test]
    fn relevance_coercion_defaults_to_low() {
        assert_eq!(Relevance::from_untrusted("HIGH"), Relevance::High);
        assert_eq!(Relevance::from_untrusted(" medium "), Relevance::Medium);
        assert_eq!(Relevance::from_untrusted("critical"), Relevance::Low);
        assert_eq!(Relevance::from_untrusted(""), Relevance::Low);
    }

    #[test]
    fn assessment_document_uses_camel_case_keys() {
        let assessment = Assessment {
            user_email: "dev@example.com".into(),
            clusters: Vec::new(),
            mappings: Vec::new(),
            questions: Vec::new(),
            narrative: None,
            generated_at: chrono::Utc::now(),
        };
        let doc = serde_json::to_value(&assessment).unwrap();
        assert!(doc.get("userEmail").is_some());
        assert!(doc.get("generatedAt").is_some());
        assert!(doc["narrative"].is_null());
    }
}
