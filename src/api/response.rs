use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

// ============================================================================
// Response envelope
// ============================================================================

/// The JSON body of every response: `{"payload": ...}` or `{"error": "..."}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Error(String),
    Payload(Value),
}

// ============================================================================
// Handler result
// ============================================================================

/// What a resource handler hands back to the dispatcher.
///
/// When `error` is set it replaces the payload in the serialized body.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub error: Option<String>,
    pub payload: Option<Value>,
    pub status: StatusCode,
}

impl HandlerResponse {
    pub fn ok(payload: impl Serialize) -> Self {
        let payload = serde_json::to_value(payload).unwrap_or_else(|_| json!({}));
        Self {
            error: None,
            payload: Some(payload),
            status: StatusCode::OK,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(json!({ "message": message.into() }))
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            payload: None,
            status,
        }
    }

    pub fn envelope(&self) -> Envelope {
        match (&self.error, &self.payload) {
            (Some(error), _) => Envelope::Error(error.clone()),
            (None, Some(payload)) => Envelope::Payload(payload.clone()),
            (None, None) => Envelope::Payload(json!({})),
        }
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.envelope())).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// A client failure (4xx) or a server error (5xx).
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Error(StatusCode, String),
    Fail(StatusCode, String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::UNAUTHORIZED, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn method_not_allowed() -> Self {
        ApiError::Fail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Error(code, _) | ApiError::Fail(code, _) => *code,
        }
    }
}

impl From<ApiError> for HandlerResponse {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Fail(code, msg) => HandlerResponse::error(code, msg),
            ApiError::Error(code, msg) => {
                tracing::error!(status = code.as_u16(), error = %msg, "Handler failed");
                HandlerResponse::error(code, msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        HandlerResponse::from(self).into_response()
    }
}
