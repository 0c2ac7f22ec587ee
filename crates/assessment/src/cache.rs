use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::warn;

use db::models::SnapshotRow;
use db::repositories::Stores;
use gh_client::model::PullRequest;

use crate::metrics;
use crate::model::{CachedPrSnapshot, DateRange};

/// Two-tier snapshot cache: an in-process LRU of JSON-serialized snapshots
/// in front of the durable store. The durable write is detached, so its
/// latency and failures never touch the local path.
pub struct SnapshotCache {
    local: Mutex<LruCache<String, String>>,
    stores: Arc<dyn Stores>,
}

impl SnapshotCache {
    pub fn new(capacity: usize, stores: Arc<dyn Stores>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1))
            .unwrap_or_else(|| NonZeroUsize::new(1).unwrap());
        Self {
            local: Mutex::new(LruCache::new(capacity)),
            stores,
        }
    }

    fn key(user_email: &str) -> String {
        format!("pr_data_{user_email}")
    }

    /// A fresh snapshot for exactly this range, from the local tier first,
    /// then the durable store. Backend errors are a miss, not a failure.
    pub async fn load(&self, user_email: &str, range: &DateRange) -> Option<Vec<PullRequest>> {
        let now_ms = Utc::now().timestamp_millis();
        let key = Self::key(user_email);

        {
            let mut guard = self.local.lock().await;
            if let Some(raw) = guard.get(&key) {
                if let Ok(snapshot) = serde_json::from_str::<CachedPrSnapshot>(raw) {
                    if snapshot.is_fresh(now_ms, range) {
                        metrics::SNAPSHOT_CACHE_HITS_TOTAL
                            .with_label_values(&["local"])
                            .inc();
                        return Some(snapshot.prs);
                    }
                }
            }
        }

        match self.stores.snapshots().find_by_user(user_email).await {
            Ok(Some(row)) => {
                let snapshot = match snapshot_from_row(&row) {
                    Some(snapshot) if snapshot.is_fresh(now_ms, range) => snapshot,
                    _ => {
                        metrics::SNAPSHOT_CACHE_MISSES_TOTAL.inc();
                        return None;
                    }
                };
                if let Ok(raw) = serde_json::to_string(&snapshot) {
                    self.local.lock().await.put(key, raw);
                }
                metrics::SNAPSHOT_CACHE_HITS_TOTAL
                    .with_label_values(&["durable"])
                    .inc();
                Some(snapshot.prs)
            }
            Ok(None) => {
                metrics::SNAPSHOT_CACHE_MISSES_TOTAL.inc();
                None
            }
            Err(err) => {
                warn!(
                    user = %user_email,
                    error = %err,
                    "durable snapshot lookup failed; treating as a miss"
                );
                metrics::SNAPSHOT_CACHE_MISSES_TOTAL.inc();
                None
            }
        }
    }

    /// The local write happens before returning; the durable copy runs in a
    /// detached task observed only through logging.
    pub async fn store(&self, user_email: &str, snapshot: CachedPrSnapshot) {
        let key = Self::key(user_email);
        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                self.local.lock().await.put(key, raw);
            }
            Err(err) => warn!(
                user = %user_email,
                error = %err,
                "snapshot serialization failed; skipping local cache"
            ),
        }

        let stores = self.stores.clone();
        let email = user_email.to_string();
        tokio::spawn(async move {
            let Some(row) = snapshot_to_row(&email, &snapshot) else {
                return;
            };
            if let Err(err) = stores.snapshots().upsert(row).await {
                warn!(user = %email, error = %err, "durable snapshot write failed");
            }
        });
    }
}

fn snapshot_from_row(row: &SnapshotRow) -> Option<CachedPrSnapshot> {
    match serde_json::from_value(row.doc.clone()) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            warn!(
                user = %row.user_email,
                error = %err,
                "stored snapshot document is unreadable"
            );
            None
        }
    }
}

fn snapshot_to_row(user_email: &str, snapshot: &CachedPrSnapshot) -> Option<SnapshotRow> {
    let fetched_at = Utc.timestamp_millis_opt(snapshot.fetched_at).single()?;
    let doc = serde_json::to_value(snapshot).ok()?;
    Some(SnapshotRow {
        user_email: user_email.to_string(),
        doc,
        fetched_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::mem::MemStores;
    use std::time::Duration;

    fn range() -> DateRange {
        DateRange {
            start: "2025-01-01".into(),
            end: "2025-06-30".into(),
        }
    }

    fn snapshot(fetched_at: i64) -> CachedPrSnapshot {
        CachedPrSnapshot {
            prs: vec![PullRequest {
                title: "Add cache".into(),
                url: "https://github.com/acme/widgets/pull/1".into(),
                repo: "acme/widgets".into(),
                merged_at: None,
                body: String::new(),
                additions: 3,
                deletions: 1,
                manual_entry: false,
            }],
            fetched_at,
            date_range: range(),
        }
    }

    async fn wait_for_durable_write(stores: &Arc<MemStores>, email: &str) {
        for _ in 0..100 {
            if stores
                .snapshots()
                .find_by_user(email)
                .await
                .unwrap()
                .is_some()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("durable snapshot write never landed");
    }

    #[tokio::test]
    async fn local_round_trip() {
        let stores = MemStores::shared();
        let cache = SnapshotCache::new(8, stores.clone());
        let now = Utc::now().timestamp_millis();

        cache.store("dev@example.com", snapshot(now)).await;

        let prs = cache.load("dev@example.com", &range()).await.unwrap();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].title, "Add cache");
    }

    #[tokio::test]
    async fn durable_tier_backfills_a_cold_local_cache() {
        let stores = MemStores::shared();
        let warm = SnapshotCache::new(8, stores.clone());
        let now = Utc::now().timestamp_millis();

        warm.store("dev@example.com", snapshot(now)).await;
        wait_for_durable_write(&stores, "dev@example.com").await;

        // Fresh cache instance: empty local tier, same durable store.
        let cold = SnapshotCache::new(8, stores.clone());
        let prs = cold.load("dev@example.com", &range()).await.unwrap();
        assert_eq!(prs.len(), 1);
    }

    #[tokio::test]
    async fn stale_snapshot_is_ignored() {
        let stores = MemStores::shared();
        let cache = SnapshotCache::new(8, stores.clone());
        let stale = Utc::now().timestamp_millis() - CachedPrSnapshot::MAX_AGE_MS - 1_000;

        cache.store("dev@example.com", snapshot(stale)).await;

        assert!(cache.load("dev@example.com", &range()).await.is_none());
    }

    #[tokio::test]
    async fn mismatched_range_is_a_miss() {
        let stores = MemStores::shared();
        let cache = SnapshotCache::new(8, stores.clone());
        let now = Utc::now().timestamp_millis();

        cache.store("dev@example.com", snapshot(now)).await;

        let other = DateRange {
            start: "2024-07-01".into(),
            end: "2024-12-31".into(),
        };
        assert!(cache.load("dev@example.com", &other).await.is_none());
    }
}
