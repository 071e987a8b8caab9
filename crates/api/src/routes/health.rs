//! Liveness probe.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health
///
/// Reports `UP` whenever the process is serving requests. The event store
/// and read model surface their own failures on the command and query
/// paths, so this probe carries no dependency checks.
pub async fn live() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        service: "order-management",
    })
}
