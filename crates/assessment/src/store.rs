use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use db::models::AssessmentRow;
use db::repositories::Stores;

use crate::model::Assessment;

/// Document-level access to persisted assessments. One document per user,
/// replaced whole on every upsert.
#[derive(Clone)]
pub struct AssessmentStore {
    stores: Arc<dyn Stores>,
}

impl AssessmentStore {
    pub fn new(stores: Arc<dyn Stores>) -> Self {
        Self { stores }
    }

    pub async fn upsert(&self, assessment: &Assessment) -> Result<()> {
        let row = AssessmentRow {
            user_email: assessment.user_email.clone(),
            doc: serde_json::to_value(assessment)?,
            generated_at: assessment.generated_at,
        };
        self.stores.assessments().upsert(row).await?;
        Ok(())
    }

    /// Backend and deserialization failures are treated as "no assessment",
    /// surfaced only through logging.
    pub async fn load_by_user(&self, user_email: &str) -> Option<Assessment> {
        match self.stores.assessments().find_by_user(user_email).await {
            Ok(Some(row)) => match serde_json::from_value(row.doc) {
                Ok(assessment) => Some(assessment),
                Err(err) => {
                    warn!(
                        user = %user_email,
                        error = %err,
                        "stored assessment document is unreadable; treating as missing"
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(
                    user = %user_email,
                    error = %err,
                    "assessment lookup failed; treating as missing"
                );
                None
            }
        }
    }
}
