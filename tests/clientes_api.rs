// HTTP flows against the full router, backed by the in-memory stores

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use clientes_ws::cache::MemoryCacheStore;
use clientes_ws::cache_key::CacheKeyBuilder;
use clientes_ws::cache_ttl::CacheTtl;
use clientes_ws::create_app_router;
use clientes_ws::db::MemoryClienteStore;
use clientes_ws::state::AppState;
use clientes_ws::tasks::BackgroundTasks;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryClienteStore>,
    cache_store: Arc<MemoryCacheStore>,
    tasks: BackgroundTasks,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryClienteStore::new());
        let cache_store = Arc::new(MemoryCacheStore::new());
        let tasks = BackgroundTasks::new(4);
        let state = AppState::with_components(
            store.clone(),
            cache_store.clone(),
            CacheKeyBuilder::new("api:"),
            CacheTtl::default(),
            tasks.clone(),
        );
        Self { router: create_app_router(Arc::new(state)), store, cache_store, tasks }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    async fn create(&self, clave: Value, nombre: &str) -> (StatusCode, Value) {
        let body = json!({
            "Clave_Cliente": clave,
            "Nombre": nombre,
            "Celular": "9613214782",
            "Email": format!("{}@gmail.com", nombre.to_lowercase()),
        });
        let result = self.send("POST", "/api/clientes", Some(body)).await;
        self.tasks.wait_idle().await;
        result
    }
}

#[tokio::test]
async fn create_then_get_from_cache() {
    let app = TestApp::new();
    let (status, body) = app.create(json!(7), "Pedro").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["Clave_Cliente"], "007");
    assert!(body["data"].get("Errores").map_or(true, Value::is_null));

    let (status, body) = app.send("GET", "/api/clientes/7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cliente obtenido desde caché");
    assert_eq!(body["meta"]["cache_hit"], true);
    assert_eq!(body["data"]["Nombre"], "Pedro");
}

#[tokio::test]
async fn get_reads_database_on_miss() {
    let app = TestApp::new();
    app.create(json!("012"), "Ana").await;
    app.send("DELETE", "/api/cache", None).await;

    let (status, body) = app.send("GET", "/api/clientes/012", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cliente obtenido desde base de datos");
    assert_eq!(body["meta"]["source"], "database");
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let app = TestApp::new();
    app.create(json!(1), "Pedro").await;

    let (status, body) = app.create(json!("1"), "Otro").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["example"]["Clave_Cliente"], "001");

    let (status, _) = app.create(json!(1000), "Pedro").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.create(json!("abc"), "Pedro").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send("POST", "/api/clientes", Some(json!({ "Nombre": "Sin clave" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Clave_Cliente es obligatorio");
}

#[tokio::test]
async fn malformed_json_returns_example() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/clientes")
        .header("content-type", "application/json")
        .body(Body::from("{\"Clave_Cliente\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Datos JSON inválidos");
    assert!(body["data"]["example"].is_object());
}

#[tokio::test]
async fn invalid_fields_are_kept_with_errores() {
    let app = TestApp::new();
    let body = json!({ "Clave_Cliente": 3, "Nombre": "P3dro", "Celular": "12", "Email": "nope" });
    let (status, body) = app.send("POST", "/api/clientes", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let errores = &body["data"]["Errores"];
    assert!(errores["Nombre"].is_array());
    assert!(errores["Celular"].is_array());
    assert!(errores["Email"].is_array());
}

#[tokio::test]
async fn pages_are_cached_and_invalidated_by_writes() {
    let app = TestApp::new();
    for clave in 1..=3 {
        app.create(json!(clave), "Pedro").await;
    }

    let (status, body) = app.send("GET", "/api/clientes/page/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Clientes obtenidos desde base de datos");
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["limit"], 100);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    app.tasks.wait_idle().await;

    let (_, body) = app.send("GET", "/api/clientes/page/1", None).await;
    assert_eq!(body["message"], "Clientes obtenidos desde caché");

    app.create(json!(4), "Luis").await;
    let (_, body) = app.send("GET", "/api/clientes/page/1", None).await;
    assert_eq!(body["meta"]["cache_hit"], false);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let (_, body) = app.send("GET", "/api/clientes/page/2", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert!(body["meta"].get("total").is_none());
}

#[tokio::test]
async fn invalid_pages_are_rejected() {
    let app = TestApp::new();
    for page in ["0", "abc", "-3", "10001"] {
        let (status, body) = app.send("GET", &format!("/api/clientes/page/{}", page), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "page {}", page);
        assert_eq!(body["data"]["example"], "1");
    }
}

#[tokio::test]
async fn update_and_delete_flow() {
    let app = TestApp::new();
    app.create(json!(9), "Pedro").await;
    app.send("GET", "/api/clientes/009", None).await;
    app.tasks.wait_idle().await;

    let cambios = json!({ "Nombre": "Ana", "Celular": "9613214782", "Email": "ana@gmail.com" });
    let (status, body) = app.send("PUT", "/api/clientes/9", Some(cambios)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["Nombre"], "Ana");
    app.tasks.wait_idle().await;

    let (_, body) = app.send("GET", "/api/clientes/009", None).await;
    assert_eq!(body["data"]["Nombre"], "Ana");

    let (status, _) = app.send("PUT", "/api/clientes/404", Some(json!({ "Nombre": "X" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.send("DELETE", "/api/clientes/009", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cliente eliminado exitosamente");
    app.tasks.wait_idle().await;

    let (status, _) = app.send("GET", "/api/clientes/009", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("DELETE", "/api/clientes/009", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn count_and_search() {
    let app = TestApp::new();
    for (clave, nombre) in [(1, "Pedro"), (2, "Pedrito"), (3, "Ana")] {
        app.create(json!(clave), nombre).await;
    }

    let (status, body) = app.send("GET", "/api/clientes/count", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_clientes"], 3);
    assert_eq!(body["data"]["total_pages"], 1);
    assert_eq!(body["data"]["items_per_page"], 100);

    let (status, body) = app.send("GET", "/api/clientes/search?nombre=pedr", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Búsqueda completada: 2 resultados encontrados");
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["meta"]["limit"], 50);

    let (status, body) = app.send("GET", "/api/clientes/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["example"]["ejemplo_url"].is_string());
}

#[tokio::test]
async fn cache_outage_is_transparent() {
    let app = TestApp::new();
    app.create(json!(5), "Pedro").await;
    app.cache_store.set_unavailable(true);

    let (status, body) = app.send("GET", "/api/clientes/5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["source"], "database");

    let (status, body) = app.send("GET", "/api/clientes/page/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.create(json!(6), "Luis").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.send("GET", "/api/cache/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available"], false);

    let (status, body) = app.send("DELETE", "/api/cache", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn cache_stats_and_flush() {
    let app = TestApp::new();
    app.create(json!(1), "Pedro").await;
    app.send("GET", "/api/clientes/1", None).await;
    app.send("GET", "/api/clientes/page/1", None).await;
    app.tasks.wait_idle().await;

    let (status, body) = app.send("GET", "/api/cache/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["source"], "redis");
    assert_eq!(body["data"]["available"], true);
    assert_eq!(body["data"]["keys"]["cliente"], 1);
    assert_eq!(body["data"]["keys"]["clientes_page"], 1);
    assert!(body["data"]["operations"]["hit"]["total"].as_u64().unwrap() >= 1);

    let (status, body) = app.send("DELETE", "/api/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Caché limpiado exitosamente");

    let (_, body) = app.send("GET", "/api/clientes/1", None).await;
    assert_eq!(body["meta"]["cache_hit"], false);
}

#[tokio::test]
async fn health_reports_each_backend() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    app.cache_store.set_unavailable(true);
    let (status, body) = app.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["redis"]["status"], "unhealthy");

    app.store.set_unavailable(true);
    let (status, body) = app.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "down");
}

#[tokio::test]
async fn metrics_are_exposed() {
    let app = TestApp::new();
    app.send("GET", "/api/clientes/count", None).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
}
