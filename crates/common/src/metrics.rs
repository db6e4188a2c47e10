use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static UPSTREAM_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "site_gateway_upstream_requests_total",
        "Total requests sent to the external backend"
    )
    .expect("register upstream_requests_total")
});

pub static UPSTREAM_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "site_gateway_upstream_failures_total",
        "Backend requests that failed or returned a non-success status"
    )
    .expect("register upstream_failures_total")
});

pub static LOCAL_FALLBACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "site_gateway_local_fallbacks_total",
        "Requests served from local JSON storage instead of the backend",
        &["resource"]
    )
    .expect("register local_fallbacks_total")
});

pub static CACHE_HITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("site_gateway_cache_hits_total", "Response cache hits")
        .expect("register cache_hits_total")
});

pub static CACHE_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("site_gateway_cache_misses_total", "Response cache misses")
        .expect("register cache_misses_total")
});

pub fn record_fallback(resource: &str) {
    LOCAL_FALLBACKS_TOTAL.with_label_values(&[resource]).inc();
}

/// Render the default registry in the Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
