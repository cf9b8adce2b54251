// ============================================================================
// CACHE ADMINISTRATION API
// ============================================================================

use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::api::common::{ApiResponse, MetaInfo};
use crate::domains::clientes::ClienteError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/cache/stats", get(get_cache_stats))
        .route("/api/cache", axum::routing::delete(clear_cache))
}

/// GET /api/cache/stats
pub async fn get_cache_stats(State(state): State<Arc<AppState>>) -> Response {
    let stats = state.clientes.cache_stats().await;
    let meta = MetaInfo { source: Some("redis"), ..MetaInfo::now() };
    ApiResponse::success("Estadísticas de caché obtenidas", Some(stats), meta).with_status(StatusCode::OK)
}

/// DELETE /api/cache
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Result<Response, ClienteError> {
    let deleted = state.clientes.clear_cache().await?;
    info!(deleted, "🧹 Cache cleared by administrator");
    Ok(ApiResponse::success("Caché limpiado exitosamente", Some(json!({ "deleted_keys": deleted })), MetaInfo::now())
        .with_status(StatusCode::OK))
}
