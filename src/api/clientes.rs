// ============================================================================
// CLIENTES API - CRUD, paging, count and search
// ============================================================================

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::api::common::{ApiResponse, MetaInfo};
use crate::domains::clientes::{ClienteError, ExamplePayload};
use crate::models::{ClienteCambios, FiltroBusqueda, NuevoCliente, SEARCH_LIMIT};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/clientes", axum::routing::post(create_cliente))
        .route("/api/clientes/page/:page", get(get_clientes_page))
        .route("/api/clientes/count", get(get_clientes_count))
        .route("/api/clientes/search", get(search_clientes))
        .route(
            "/api/clientes/:clave",
            get(get_cliente).put(update_cliente).delete(delete_cliente),
        )
}

fn parse_page(raw: &str) -> Result<u32, ClienteError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ClienteError::InvalidPage(raw.to_string()));
    }
    raw.parse::<u32>().map_err(|_| ClienteError::InvalidPage(raw.to_string()))
}

/// POST /api/clientes
pub async fn create_cliente(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NuevoCliente>, JsonRejection>,
) -> Result<Response, ClienteError> {
    let Json(nuevo) = payload.map_err(|rejection| ClienteError::InvalidJson {
        reason: rejection.body_text(),
        example: ExamplePayload::Create,
    })?;

    let cliente = state.clientes.create(nuevo).await?;
    Ok(ApiResponse::success("Cliente creado exitosamente", Some(cliente), MetaInfo::now())
        .with_status(StatusCode::CREATED))
}

/// GET /api/clientes/page/:page
pub async fn get_clientes_page(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
) -> Result<Response, ClienteError> {
    let page = parse_page(&page)?;
    let result = state.clientes.list_page(page).await?;

    let message = if result.source.is_cache() {
        "Clientes obtenidos desde caché"
    } else {
        "Clientes obtenidos desde base de datos"
    };
    let meta = MetaInfo {
        page: Some(result.page),
        limit: Some(result.limit),
        total: result.total,
        ..MetaInfo::with_source(result.source.as_str(), result.source.is_cache())
    };
    Ok(ApiResponse::success(message, Some(result.items), meta).with_status(StatusCode::OK))
}

/// GET /api/clientes/count
pub async fn get_clientes_count(State(state): State<Arc<AppState>>) -> Result<Response, ClienteError> {
    let conteo = state.clientes.count().await?;
    let meta = MetaInfo {
        total: Some(conteo.value.total_clientes),
        ..MetaInfo::with_source(conteo.source.as_str(), conteo.source.is_cache())
    };
    Ok(ApiResponse::success("Conteo obtenido exitosamente", Some(conteo.value), meta).with_status(StatusCode::OK))
}

/// GET /api/clientes/search?nombre=&email=&celular=
pub async fn search_clientes(
    State(state): State<Arc<AppState>>,
    Query(filtro): Query<FiltroBusqueda>,
) -> Result<Response, ClienteError> {
    let (clientes, total) = state.clientes.search(filtro).await?;
    let message = format!("Búsqueda completada: {} resultados encontrados", clientes.len());
    let meta = MetaInfo {
        limit: Some(SEARCH_LIMIT),
        total: Some(total),
        source: Some("database"),
        ..MetaInfo::now()
    };
    Ok(ApiResponse::success(message, Some(clientes), meta).with_status(StatusCode::OK))
}

/// GET /api/clientes/:clave
pub async fn get_cliente(
    State(state): State<Arc<AppState>>,
    Path(clave): Path<String>,
) -> Result<Response, ClienteError> {
    let fetched = state.clientes.get(&clave).await?;
    let message = if fetched.source.is_cache() {
        "Cliente obtenido desde caché"
    } else {
        "Cliente obtenido desde base de datos"
    };
    let meta = MetaInfo::with_source(fetched.source.as_str(), fetched.source.is_cache());
    Ok(ApiResponse::success(message, Some(fetched.value), meta).with_status(StatusCode::OK))
}

/// PUT /api/clientes/:clave
pub async fn update_cliente(
    State(state): State<Arc<AppState>>,
    Path(clave): Path<String>,
    payload: Result<Json<ClienteCambios>, JsonRejection>,
) -> Result<Response, ClienteError> {
    let Json(cambios) = payload.map_err(|rejection| ClienteError::InvalidJson {
        reason: rejection.body_text(),
        example: ExamplePayload::Update,
    })?;

    let cliente = state.clientes.update(&clave, cambios).await?;
    Ok(ApiResponse::success("Cliente actualizado exitosamente", Some(cliente), MetaInfo::now())
        .with_status(StatusCode::OK))
}

/// DELETE /api/clientes/:clave
pub async fn delete_cliente(
    State(state): State<Arc<AppState>>,
    Path(clave): Path<String>,
) -> Result<Response, ClienteError> {
    state.clientes.delete(&clave).await?;
    Ok(ApiResponse::<()>::success("Cliente eliminado exitosamente", None, MetaInfo::now())
        .with_status(StatusCode::OK))
}

#[cfg(test)]
mod tests {
    use super::parse_page;

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page("12").unwrap(), 12);
        assert!(parse_page("").is_err());
        assert!(parse_page("-1").is_err());
        assert!(parse_page("1a").is_err());
        assert!(parse_page("99999999999").is_err());
    }
}
