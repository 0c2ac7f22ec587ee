use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};
use url::Url;

use assessment::cache::SnapshotCache;
use assessment::ingest::PrIngestService;
use assessment::model::DateRange;
use assessment::pipeline::AnalysisPipeline;
use assessment::rubric::Level;
use assessment::store::AssessmentStore;
use common::{config::AppConfig, logging, PlaintextTokenCipher, TokenCipher};
use db::mem::MemStores;
use db::pg::PgStores;
use db::repositories::Stores;
use genai::client::ChatCompletionsClient;
use gh_client::enrich::PullRequestEnricher;
use gh_client::fetcher::ReqwestExecutor;
use gh_client::search::PullRequestSearchClient;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("info");
    let config = AppConfig::load()?;

    let cipher = PlaintextTokenCipher;
    let identity = config
        .github
        .token_key_id
        .clone()
        .unwrap_or_else(|| config.review.user_email.clone());
    let token = cipher.decrypt(&config.github.token, &identity)?;
    let level: Level = config.review.level.parse()?;

    let stores: Arc<dyn Stores> = match &config.database.url {
        Some(db_url) => Arc::new(PgStores::connect(db_url).await?),
        None => {
            info!("no database configured; results are kept in memory only");
            MemStores::shared()
        }
    };

    let exec = Arc::new(ReqwestExecutor::new());
    let search = PullRequestSearchClient::with_base(
        exec.clone(),
        config.github.user_agent.clone(),
        Url::parse(&config.github.api_base)?,
    );
    let enricher = PullRequestEnricher::new(exec, config.github.user_agent.clone());
    let cache = SnapshotCache::new(config.cache.snapshot_capacity, stores.clone());
    let ingest = PrIngestService::new(
        search,
        enricher,
        cache,
        config.review.manual_pr_urls.clone(),
    );

    let range = DateRange {
        start: config.review.period_start.clone(),
        end: config.review.period_end.clone(),
    };
    let prs = ingest
        .fetch_prs(
            &token,
            &config.github.username,
            &config.review.user_email,
            &range,
            |progress| match progress.enriched {
                Some(done) => info!(done, total = progress.total, "enriching pull requests"),
                None => info!(
                    fetched = progress.fetched,
                    total = progress.total,
                    "fetching pull requests"
                ),
            },
        )
        .await?;
    info!(count = prs.len(), "pull requests ready for analysis");

    let generator = Arc::new(ChatCompletionsClient::new(&config.genai));
    let pipeline = AnalysisPipeline::new(generator, AssessmentStore::new(stores));
    let assessment = pipeline
        .run(prs, level, &config.review.user_email, |event| {
            debug!(
                step = event.step,
                label = %event.label,
                bytes = event.detail.len(),
                "stage progress"
            );
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}
