//! Prometheus scrape endpoint.
//!
//! Renders the process-wide recorder in the text exposition format. The
//! counters of interest are `order_commands_total` (by command),
//! `dispatcher_conflict_retries_total`, `dispatcher_slot_timeouts_total`,
//! `dispatcher_publish_failures_total`, `projection_events_processed_total`
//! and `projection_failures_total`.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics
pub async fn scrape(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        handle.render(),
    )
}
