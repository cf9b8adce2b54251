use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub mod cache_admin;
pub mod clientes;
pub mod common;
pub mod error_handling;

pub use common::{ApiResponse, MetaInfo};

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new().merge(clientes::router()).merge(cache_admin::router())
}
