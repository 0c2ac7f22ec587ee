pub mod cache;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod rubric;
pub mod store;

pub use cache::SnapshotCache;
pub use ingest::PrIngestService;
pub use model::{Assessment, CachedPrSnapshot, CategoryMapping, Cluster, DateRange, QuestionSet};
pub use pipeline::{AnalysisPipeline, StageEvent};
pub use rubric::Level;
pub use store::AssessmentStore;
