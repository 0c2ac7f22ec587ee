use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{AssessmentRow, SnapshotRow};

#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Replace the whole document for the row's user, inserting when absent.
    async fn upsert(&self, row: AssessmentRow) -> Result<()>;
    async fn find_by_user(&self, user_email: &str) -> Result<Option<AssessmentRow>>;
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn upsert(&self, row: SnapshotRow) -> Result<()>;
    async fn find_by_user(&self, user_email: &str) -> Result<Option<SnapshotRow>>;
}

pub trait Stores: Send + Sync {
    fn assessments(&self) -> &dyn AssessmentRepository;
    fn snapshots(&self) -> &dyn SnapshotRepository;
}
