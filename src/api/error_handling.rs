use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use tracing::error;

use crate::api::common::ApiResponse;
use crate::domains::clientes::{ClienteError, ExamplePayload};
use crate::observability::record_error;

// ============================================================================
// REQUEST EXAMPLES
// ============================================================================

fn example_create() -> Value {
    json!({
        "Clave_Cliente": "001",
        "Nombre": "Pedro",
        "Celular": "9613214782",
        "Email": "correo@example.com"
    })
}

fn example_update() -> Value {
    json!({
        "Nombre": "Pedro",
        "Celular": "9613214782",
        "Email": "correo@example.com"
    })
}

fn example_for(payload: ExamplePayload) -> Value {
    match payload {
        ExamplePayload::Create => example_create(),
        ExamplePayload::Update => example_update(),
    }
}

// ============================================================================
// HTTP RESPONSE CONVERSION
// ============================================================================

impl IntoResponse for ClienteError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, response) = match self {
            ClienteError::InvalidJson { reason, example } => (
                StatusCode::BAD_REQUEST,
                ApiResponse::failure(message, Some(Value::String(reason)), Some(example_for(example))),
            ),
            ClienteError::MissingClave | ClienteError::InvalidClave(_) | ClienteError::AlreadyExists(_) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::failure(message, None, Some(example_create())),
            ),
            ClienteError::InvalidPage(_) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::failure(message, None, Some(Value::from("1"))),
            ),
            ClienteError::MissingSearchCriteria => (
                StatusCode::BAD_REQUEST,
                ApiResponse::failure(
                    message,
                    None,
                    Some(json!({ "ejemplo_url": "/api/clientes/search?nombre=Pedro&email=pedro@gmail.com" })),
                ),
            ),
            ClienteError::NotFound(_) => (StatusCode::NOT_FOUND, ApiResponse::failure(message, None, None)),
            ClienteError::Store(e) => {
                error!(error = %e, "❌ Document store failure");
                record_error("store", "clientes");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::failure("Error interno del servidor", None, None),
                )
            }
            ClienteError::Cache(e) => {
                error!(error = %e, "❌ Cache administration failure");
                record_error("cache", "cache_admin");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ApiResponse::failure("Error limpiando caché", Some(Value::String(e.to_string())), None),
                )
            }
        };

        response.with_status(status)
    }
}
