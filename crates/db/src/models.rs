use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One persisted self-assessment. The aggregate is stored whole as a JSONB
/// document; the key columns exist only for lookup and display.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentRow {
    pub user_email: String,
    pub doc: serde_json::Value,
    pub generated_at: DateTime<Utc>,
}

/// Durable copy of a pull-request snapshot, mirroring the in-process cache.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SnapshotRow {
    pub user_email: String,
    pub doc: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}
