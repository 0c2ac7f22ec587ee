use chrono::Utc;
use db::pg::PgStores;
use db::{AssessmentRow, Stores};
use serde_json::json;

#[tokio::test]
async fn pg_upsert_is_idempotent_per_user() -> anyhow::Result<()> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping pg_upsert_is_idempotent_per_user: TEST_DATABASE_URL not set");
            return Ok(());
        }
    };
    let stores = match PgStores::connect(&url).await {
        Ok(stores) => stores,
        Err(err) => {
            eprintln!("skipping pg_upsert_is_idempotent_per_user: {err}");
            return Ok(());
        }
    };

    let email = format!("upsert-{}@example.com", Utc::now().timestamp_nanos_opt().unwrap_or(0));
    stores
        .assessments()
        .upsert(AssessmentRow {
            user_email: email.clone(),
            doc: json!({"narrative": null, "clusters": ["first"]}),
            generated_at: Utc::now(),
        })
        .await?;
    stores
        .assessments()
        .upsert(AssessmentRow {
            user_email: email.clone(),
            doc: json!({"narrative": null, "clusters": ["second"]}),
            generated_at: Utc::now(),
        })
        .await?;

    let row = stores
        .assessments()
        .find_by_user(&email)
        .await?
        .expect("document stored");
    assert_eq!(row.doc["clusters"], json!(["second"]));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE user_email = $1")
        .bind(&email)
        .fetch_one(stores.pool())
        .await?;
    assert_eq!(count, 1);

    Ok(())
}
