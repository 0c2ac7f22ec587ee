use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

pub static PIPELINE_RUNS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "assessment_pipeline_runs_total",
        "Analysis pipeline runs started"
    )
    .expect("pipeline runs total")
});

pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "assessment_stage_duration_seconds",
        "Wall time of one generation stage call, grouped by stage",
        &["stage"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("stage duration histogram")
});

pub static SNAPSHOT_CACHE_HITS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "assessment_snapshot_cache_hits_total",
        "Fresh snapshot lookups grouped by tier (local/durable)",
        &["tier"]
    )
    .expect("snapshot cache hits")
});

pub static SNAPSHOT_CACHE_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "assessment_snapshot_cache_misses_total",
        "Snapshot lookups that found nothing fresh in any tier"
    )
    .expect("snapshot cache misses")
});
