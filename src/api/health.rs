//! Health check endpoint.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Create the health router
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

/// `GET /health`: liveness probe for load balancers.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_ok_and_version() {
        let Json(response) = health_check().await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
    }
}
