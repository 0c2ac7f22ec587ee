use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};

pub static SEARCH_PAGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gh_search_pages_total",
        "Search result pages fetched from the GitHub search API"
    )
    .expect("search pages total")
});

pub static SEARCH_HITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gh_search_hits_total",
        "Raw search hits accumulated across all search calls"
    )
    .expect("search hits total")
});

pub static ENRICH_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gh_enrich_failures_total",
        "Per-item detail fetches that failed and fell back to search data"
    )
    .expect("enrich failures total")
});

pub static RATE_LIMIT_SLEEP_SECONDS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gh_rate_limit_sleep_seconds_total",
        "Seconds slept waiting for a rate limit reset"
    )
    .expect("rate limit sleep seconds")
});

pub static RATE_LIMIT_GIVEUPS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gh_rate_limit_giveups_total",
        "Rate-limited requests abandoned because the reset fell outside the retry window"
    )
    .expect("rate limit giveups")
});
