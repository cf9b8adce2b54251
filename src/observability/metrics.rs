// ============================================================================
// PROMETHEUS METRICS - Observabilidad del servicio de clientes
// ============================================================================
// Métricas HTTP, base de datos, cache y tareas en segundo plano
// ============================================================================

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
};

lazy_static! {
    // ========================================================================
    // HTTP REQUEST METRICS
    // ========================================================================

    /// Total de requests HTTP por método, endpoint y status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0]
    )
    .unwrap();

    pub static ref HTTP_RESPONSE_SIZE_BYTES: HistogramVec = register_histogram_vec!(
        "http_response_size_bytes",
        "HTTP response size in bytes",
        &["method", "endpoint"],
        vec![100.0, 1000.0, 5000.0, 10000.0, 50000.0, 100000.0, 500000.0]
    )
    .unwrap();

    // ========================================================================
    // DATABASE METRICS
    // ========================================================================

    pub static ref DB_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_queries_total",
        "Total number of database queries",
        &["query_type", "table", "status"]
    )
    .unwrap();

    pub static ref DB_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_query_duration_seconds",
        "Database query duration in seconds",
        &["query_type", "table"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]
    )
    .unwrap();

    /// Conexiones del pool (activas / idle)
    pub static ref DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_connections",
        "Database pool connections by state",
        &["pool", "state"]
    )
    .unwrap();

    // ========================================================================
    // CACHE METRICS
    // ========================================================================

    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_hits_total",
        "Total number of cache hits",
        &["entry_type"]
    )
    .unwrap();

    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_misses_total",
        "Total number of cache misses",
        &["entry_type"]
    )
    .unwrap();

    /// Invalidaciones por alcance (entity, pages, write, flush)
    pub static ref CACHE_INVALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_invalidations_total",
        "Total number of cache invalidations",
        &["scope"]
    )
    .unwrap();

    // ========================================================================
    // BACKGROUND TASKS
    // ========================================================================

    pub static ref BACKGROUND_TASK_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_background_task_failures_total",
        "Background cache jobs that returned an error",
        &["task"]
    )
    .unwrap();

    pub static ref BACKGROUND_TASKS_PENDING: IntGauge = register_int_gauge!(
        "cache_background_tasks_pending",
        "Background cache jobs queued or running"
    )
    .unwrap();

    // ========================================================================
    // ERRORS
    // ========================================================================

    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_total",
        "Total errors by type and component",
        &["error_type", "component"]
    )
    .unwrap();
}

// ============================================================================
// HELPERS
// ============================================================================

/// Registra una request HTTP completa
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64, response_size: usize) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration_secs);

    HTTP_RESPONSE_SIZE_BYTES
        .with_label_values(&[method, endpoint])
        .observe(response_size as f64);
}

/// Registra una query de base de datos
pub fn record_db_query(query_type: &str, table: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    DB_QUERIES_TOTAL
        .with_label_values(&[query_type, table, status])
        .inc();

    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[query_type, table])
        .observe(duration_secs);
}

pub fn update_db_pool_stats(pool: &str, size: u32, idle: usize) {
    let idle = idle as i64;
    DB_POOL_CONNECTIONS
        .with_label_values(&[pool, "active"])
        .set(size as i64 - idle);
    DB_POOL_CONNECTIONS.with_label_values(&[pool, "idle"]).set(idle);
}

/// Registra cache hit/miss por tipo de entrada
pub fn record_cache_access(entry_type: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.with_label_values(&[entry_type]).inc();
    } else {
        CACHE_MISSES_TOTAL.with_label_values(&[entry_type]).inc();
    }
}

pub fn record_cache_invalidation(scope: &str) {
    CACHE_INVALIDATIONS_TOTAL.with_label_values(&[scope]).inc();
}

pub fn record_background_failure(task: &str) {
    BACKGROUND_TASK_FAILURES_TOTAL.with_label_values(&[task]).inc();
}

pub fn set_background_pending(pending: usize) {
    BACKGROUND_TASKS_PENDING.set(pending as i64);
}

/// Registra un error
pub fn record_error(error_type: &str, component: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, component])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_access_counters() {
        let hits = CACHE_HITS_TOTAL.with_label_values(&["metrics_test"]).get();
        let misses = CACHE_MISSES_TOTAL.with_label_values(&["metrics_test"]).get();
        record_cache_access("metrics_test", true);
        record_cache_access("metrics_test", false);
        record_cache_access("metrics_test", false);
        assert_eq!(CACHE_HITS_TOTAL.with_label_values(&["metrics_test"]).get(), hits + 1);
        assert_eq!(CACHE_MISSES_TOTAL.with_label_values(&["metrics_test"]).get(), misses + 2);
    }

    #[test]
    fn test_pool_gauges() {
        update_db_pool_stats("metrics_test", 10, 4);
        assert_eq!(DB_POOL_CONNECTIONS.with_label_values(&["metrics_test", "active"]).get(), 6);
        assert_eq!(DB_POOL_CONNECTIONS.with_label_values(&["metrics_test", "idle"]).get(), 4);
    }
}
