use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};
use service::observer::{CookieObserver, TracingObserver};
use service::ServiceError;

// Prometheus metrics (default registry)
pub static COOKIES_SAVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("cookie_api_cookies_saved_total", "Total cookies saved")
        .expect("register cookies_saved_total")
});

pub static COOKIES_REMOVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("cookie_api_cookies_removed_total", "Total cookies removed")
        .expect("register cookies_removed_total")
});

pub static STATS_UPDATE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cookie_api_stats_update_failures_total",
        "Stats updates that failed and were swallowed"
    )
    .expect("register stats_update_failures_total")
});

pub static STORE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cookie_api_store_errors_total",
        "Store reads that failed and were skipped"
    )
    .expect("register store_errors_total")
});

/// Logs through [`TracingObserver`] and counts into the statics above.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsObserver {
    log: TracingObserver,
}

impl CookieObserver for MetricsObserver {
    fn cookie_saved(&self, key: &str, value: &str) {
        COOKIES_SAVED_TOTAL.inc();
        self.log.cookie_saved(key, value);
    }

    fn cookie_removed(&self, key: &str, value: &str) {
        COOKIES_REMOVED_TOTAL.inc();
        self.log.cookie_removed(key, value);
    }

    fn stats_update_failed(&self, stats_key: &str, category: &str, err: &ServiceError) {
        STATS_UPDATE_FAILURES_TOTAL.inc();
        self.log.stats_update_failed(stats_key, category, err);
    }

    fn key_skipped(&self, key: &str, err: &ServiceError) {
        STORE_ERRORS_TOTAL.inc();
        self.log.key_skipped(key, err);
    }
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    // touch the counters so they are exported before their first event
    Lazy::force(&COOKIES_SAVED_TOTAL);
    Lazy::force(&COOKIES_REMOVED_TOTAL);
    Lazy::force(&STATS_UPDATE_FAILURES_TOTAL);
    Lazy::force(&STORE_ERRORS_TOTAL);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
