use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::Result;
use crate::models::{AssessmentRow, SnapshotRow};
use crate::repositories::{AssessmentRepository, SnapshotRepository, Stores};

/// Process-local store keyed by user email. Used when no database URL is
/// configured, and by tests.
#[derive(Default)]
pub struct MemStores {
    assessments: MemAssessmentRepository,
    snapshots: MemSnapshotRepository,
}

impl MemStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Stores for MemStores {
    fn assessments(&self) -> &dyn AssessmentRepository {
        &self.assessments
    }

    fn snapshots(&self) -> &dyn SnapshotRepository {
        &self.snapshots
    }
}

#[derive(Default)]
struct MemAssessmentRepository {
    rows: Mutex<HashMap<String, AssessmentRow>>,
}

#[async_trait]
impl AssessmentRepository for MemAssessmentRepository {
    async fn upsert(&self, row: AssessmentRow) -> Result<()> {
        let mut guard = self.rows.lock().await;
        guard.insert(row.user_email.clone(), row);
        Ok(())
    }

    async fn find_by_user(&self, user_email: &str) -> Result<Option<AssessmentRow>> {
        let guard = self.rows.lock().await;
        Ok(guard.get(user_email).cloned())
    }
}

#[derive(Default)]
struct MemSnapshotRepository {
    rows: Mutex<HashMap<String, SnapshotRow>>,
}

#[async_trait]
impl SnapshotRepository for MemSnapshotRepository {
    async fn upsert(&self, row: SnapshotRow) -> Result<()> {
        let mut guard = self.rows.lock().await;
        guard.insert(row.user_email.clone(), row);
        Ok(())
    }

    async fn find_by_user(&self, user_email: &str) -> Result<Option<SnapshotRow>> {
        let guard = self.rows.lock().await;
        Ok(guard.get(user_email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_replaces_existing_document() {
        let stores = MemStores::new();
        let first = AssessmentRow {
            user_email: "dev@example.com".into(),
            doc: json!({"clusters": 1}),
            generated_at: Utc::now(),
        };
        let second = AssessmentRow {
            user_email: "dev@example.com".into(),
            doc: json!({"clusters": 2}),
            generated_at: Utc::now(),
        };

        stores.assessments().upsert(first).await.unwrap();
        stores.assessments().upsert(second).await.unwrap();

        let stored = stores
            .assessments()
            .find_by_user("dev@example.com")
            .await
            .unwrap()
            .expect("row present");
        assert_eq!(stored.doc, json!({"clusters": 2}));
    }

    #[tokio::test]
    async fn find_missing_user_returns_none() {
        let stores = MemStores::new();
        let found = stores.assessments().find_by_user("ghost@example.com").await.unwrap();
        assert!(found.is_none());
    }
}
