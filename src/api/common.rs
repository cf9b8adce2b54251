use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    pub meta: MetaInfo,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetaInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    /// Unix seconds
    pub timestamp: i64,
}

impl MetaInfo {
    pub fn now() -> Self {
        Self { timestamp: Utc::now().timestamp(), ..Default::default() }
    }

    pub fn with_source(source: &'static str, cache_hit: bool) -> Self {
        Self { source: Some(source), cache_hit: Some(cache_hit), ..Self::now() }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: Option<T>, meta: MetaInfo) -> Self {
        Self { success: true, message: Some(message.into()), data, error: None, meta }
    }

    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl ApiResponse<Value> {
    pub fn failure(message: impl Into<String>, error: Option<Value>, example: Option<Value>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: example.map(|example| serde_json::json!({ "example": example })),
            error,
            meta: MetaInfo::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_meta_fields_are_omitted() {
        let body = serde_json::to_value(ApiResponse::success("ok", Some(1), MetaInfo::now())).unwrap();
        assert_eq!(body["success"], true);
        assert!(body["meta"].get("page").is_none());
        assert!(body["meta"]["timestamp"].is_i64());
        assert!(body.get("error").is_none());
    }

    #[test]
    fn test_failure_carries_example() {
        let body = serde_json::to_value(ApiResponse::failure("bad", None, Some(Value::from("1")))).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["example"], "1");
    }
}
