pub mod endpoints;

use serde::Serialize;
use std::time::SystemTime;
use tracing::info;

pub use endpoints::monitoring_router;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Degraded,
    Down,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: OverallStatus,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub services: ServiceHealthStatus,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealthStatus {
    pub database: ServiceStatus,
    pub redis: ServiceStatus,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub status: String,
    pub response_time_ms: Option<u64>,
    pub error: Option<String>,
}

impl ServiceStatus {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self { status: "healthy".to_string(), response_time_ms: Some(response_time_ms), error: None }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self { status: "unhealthy".to_string(), response_time_ms: None, error: Some(error.into()) }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// The document store is authoritative: without it the API is down. A missing
/// cache only costs latency.
pub fn overall_status(database_ok: bool, redis_ok: bool) -> OverallStatus {
    match (database_ok, redis_ok) {
        (false, _) => OverallStatus::Down,
        (true, false) => OverallStatus::Degraded,
        (true, true) => OverallStatus::Ok,
    }
}

static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

pub fn init_monitoring() {
    START_TIME.set(SystemTime::now()).ok();
    info!("🔍 Monitoring system initialized");
}

pub fn uptime_seconds() -> u64 {
    START_TIME
        .get()
        .and_then(|start| SystemTime::now().duration_since(*start).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(true, true), OverallStatus::Ok);
        assert_eq!(overall_status(true, false), OverallStatus::Degraded);
        assert_eq!(overall_status(false, true), OverallStatus::Down);
        assert_eq!(overall_status(false, false), OverallStatus::Down);
    }
}
