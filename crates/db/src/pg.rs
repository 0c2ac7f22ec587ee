use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::time::{sleep, Duration};
use tracing::{instrument, warn};

use crate::errors::{DbError, Result};
use crate::models::{AssessmentRow, SnapshotRow};
use crate::repositories::{AssessmentRepository, SnapshotRepository, Stores};

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(DbError::Migration)
}

#[derive(Clone)]
pub struct PgStores {
    pool: PgPool,
    assessment_repo: Arc<PgAssessmentRepository>,
    snapshot_repo: Arc<PgSnapshotRepository>,
}

impl PgStores {
    pub async fn connect(database_url: &str) -> Result<Self> {
        const MAX_ATTEMPTS: u32 = 5;
        const BASE_DELAY_MS: u64 = 500;

        let mut attempts = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
            {
                Ok(pool) => {
                    run_migrations(&pool).await?;
                    return Ok(Self::from_pool(pool));
                }
                Err(err) => {
                    attempts += 1;
                    if attempts >= MAX_ATTEMPTS {
                        return Err(DbError::Query(err));
                    }

                    let exp = (attempts - 1).min(5);
                    let backoff = Duration::from_millis(BASE_DELAY_MS * (1u64 << exp));
                    warn!(
                        attempts,
                        error = %err,
                        wait_ms = backoff.as_millis(),
                        "database connection failed; retrying"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let assessment_repo = Arc::new(PgAssessmentRepository { pool: pool.clone() });
        let snapshot_repo = Arc::new(PgSnapshotRepository { pool: pool.clone() });

        Self {
            pool,
            assessment_repo,
            snapshot_repo,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Stores for PgStores {
    fn assessments(&self) -> &dyn AssessmentRepository {
        &*self.assessment_repo
    }

    fn snapshots(&self) -> &dyn SnapshotRepository {
        &*self.snapshot_repo
    }
}

#[derive(Clone)]
struct PgAssessmentRepository {
    pool: PgPool,
}

#[async_trait]
impl AssessmentRepository for PgAssessmentRepository {
    #[instrument(skip(self, row), fields(user_email = %row.user_email))]
    async fn upsert(&self, row: AssessmentRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO assessments (user_email, doc, generated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_email) DO UPDATE
                SET doc = EXCLUDED.doc,
                    generated_at = EXCLUDED.generated_at
            "#,
        )
        .bind(row.user_email)
        .bind(row.doc)
        .bind(row.generated_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(DbError::Query)
    }

    async fn find_by_user(&self, user_email: &str) -> Result<Option<AssessmentRow>> {
        sqlx::query_as::<_, AssessmentRow>(
            "SELECT user_email, doc, generated_at FROM assessments WHERE user_email = $1",
        )
        .bind(user_email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}

#[derive(Clone)]
struct PgSnapshotRepository {
    pool: PgPool,
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    #[instrument(skip(self, row), fields(user_email = %row.user_email))]
    async fn upsert(&self, row: SnapshotRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pr_snapshots (user_email, doc, fetched_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_email) DO UPDATE
                SET doc = EXCLUDED.doc,
                    fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(row.user_email)
        .bind(row.doc)
        .bind(row.fetched_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(DbError::Query)
    }

    async fn find_by_user(&self, user_email: &str) -> Result<Option<SnapshotRow>> {
        sqlx::query_as::<_, SnapshotRow>(
            "SELECT user_email, doc, fetched_at FROM pr_snapshots WHERE user_email = $1",
        )
        .bind(user_email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}
