//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - The query-page cache (lookups, inserts)
//! - The movie store (upserts)
//! - The upstream source (requests, latency)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Query-Page Cache
// =============================================================================

/// Page cache lookups by result.
pub static PAGE_CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cinecache_page_cache_lookups_total",
            "Query-page cache lookups",
        ),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

/// Page inserts by outcome.
pub static PAGE_INSERTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cinecache_page_inserts_total",
            "Query-page cache insert attempts",
        ),
        &["outcome"], // "inserted", "already_exists", "rejected"
    )
    .unwrap()
});

// =============================================================================
// Movie Store
// =============================================================================

/// Movie upserts by result.
pub static MOVIE_UPSERTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cinecache_movie_upserts_total", "Movie upserts"),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

// =============================================================================
// Upstream
// =============================================================================

/// Upstream requests by endpoint and result.
pub static UPSTREAM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cinecache_upstream_requests_total",
            "Requests sent to the upstream movie source",
        ),
        &["endpoint", "result"], // endpoint: "popular", "search", "movie"
    )
    .unwrap()
});

/// Upstream request duration in seconds.
pub static UPSTREAM_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cinecache_upstream_request_duration_seconds",
            "Duration of upstream requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["endpoint"],
    )
    .unwrap()
});

/// All core metrics, for registration by the server.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PAGE_CACHE_LOOKUPS.clone()),
        Box::new(PAGE_INSERTS.clone()),
        Box::new(MOVIE_UPSERTS.clone()),
        Box::new(UPSTREAM_REQUESTS.clone()),
        Box::new(UPSTREAM_REQUEST_DURATION.clone()),
    ]
}
