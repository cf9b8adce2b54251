use axum::{
    http::{header, Method},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod cache_key;
pub mod cache_ttl;
pub mod db;
pub mod domains;
pub mod models;
pub mod state;
pub mod tasks;

// Production-ready modules
pub mod monitoring;
pub mod observability;
pub mod optimization;

use api::create_api_router;
use monitoring::monitoring_router;
use observability::metrics_middleware;
use state::AppState;

use axum::middleware as axum_middleware;

pub fn get_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Endpoints de monitoreo - incluye /metrics de Prometheus
        .merge(monitoring_router())
        // API endpoints con estado
        .merge(create_api_router())
        .with_state(app_state)
        .layer(axum_middleware::from_fn(metrics_middleware)) // 📊 Captura métricas automáticamente
        .layer(TraceLayer::new_for_http())
        .layer(get_cors_layer())
}
