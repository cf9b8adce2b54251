use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::{overall_status, uptime_seconds, HealthResponse, OverallStatus, ServiceHealthStatus, ServiceStatus};
use crate::cache::CacheHealth;
use crate::observability::metrics_handler;
use crate::state::AppState;

/// Create monitoring router with metrics and health endpoints
pub fn monitoring_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
}

/// Health check with dependencies
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start_time = Instant::now();

    let (database, redis) = tokio::join!(check_database_health(&state), check_redis_health(&state));
    let status = overall_status(database.is_healthy(), redis.is_healthy());

    let status_code = match status {
        OverallStatus::Ok => StatusCode::OK,
        OverallStatus::Degraded => StatusCode::PARTIAL_CONTENT,
        OverallStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    info!(
        "🔍 Health check completed in {}ms - Status: {:?}",
        start_time.elapsed().as_millis(),
        status
    );

    let health = HealthResponse {
        status,
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(),
        services: ServiceHealthStatus { database, redis },
    };

    (status_code, Json(health))
}

async fn check_database_health(state: &AppState) -> ServiceStatus {
    let start = Instant::now();
    match state.clientes.store().ping().await {
        Ok(()) => ServiceStatus::healthy(start.elapsed().as_millis() as u64),
        Err(e) => {
            error!("❌ Database health check failed: {}", e);
            ServiceStatus::unhealthy(e.to_string())
        }
    }
}

async fn check_redis_health(state: &AppState) -> ServiceStatus {
    let start = Instant::now();
    match state.clientes.cache().health_check().await {
        CacheHealth::Ok => ServiceStatus::healthy(start.elapsed().as_millis() as u64),
        CacheHealth::Degraded(reason) => {
            warn!("⚠️ Redis health check failed: {}", reason);
            ServiceStatus::unhealthy(reason)
        }
    }
}
