//! Request dispatch
//!
//! Every request goes through three steps in order: parse the transport
//! request into a [`ParsedRequest`], hand it to the resource the path maps
//! to, and serialize the handler's [`HandlerResponse`] back out.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request, Uri},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::response::HandlerResponse;
use crate::AppState;

/// Largest request body that is read; anything bigger parses as empty.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Request method tokens a resource can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Del,
    Get,
    Post,
    Put,
}

impl Method {
    /// Map a lowercase method token; `delete` lands in the `Del` slot.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "post" => Some(Method::Post),
            "get" => Some(Method::Get),
            "put" => Some(Method::Put),
            "delete" => Some(Method::Del),
            _ => None,
        }
    }
}

/// A request reduced to what handlers look at.
#[derive(Debug, Clone, Default)]
pub struct ParsedRequest {
    /// Always a JSON object; empty when the body was missing or unparseable
    pub body: Value,
    pub headers: HeaderMap,
    /// Lowercase method token
    pub method: String,
    /// Path without leading or trailing slashes
    pub path: String,
    pub query: HashMap<String, String>,
}

impl ParsedRequest {
    pub fn method(&self) -> Option<Method> {
        Method::from_token(&self.method)
    }

    /// A trimmed, non-empty query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Fallback handler serving every path.
pub async fn dispatch(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let parsed = parse_request(request).await;

    let route = state.routes.resolve(&parsed.path);
    let response = route
        .handle(&state, &parsed)
        .await
        .unwrap_or_else(HandlerResponse::from);

    log_response(&parsed, &response);
    response.into_response()
}

/// Split a transport request into path, method, query, headers and body.
pub async fn parse_request(request: Request<Body>) -> ParsedRequest {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => parse_body(&bytes),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read request body, treating as empty");
            empty_record()
        }
    };

    ParsedRequest {
        body,
        headers: parts.headers,
        method: parts.method.as_str().to_lowercase(),
        path: trim_path(parts.uri.path()),
        query: parse_query(&parts.uri),
    }
}

pub fn trim_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn parse_query(uri: &Uri) -> HashMap<String, String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(query)| query)
        .unwrap_or_default()
}

/// Parse a JSON body permissively.
///
/// Empty bodies, invalid JSON and JSON that is not an object all become an
/// empty record; parsing never fails the request.
pub fn parse_body(bytes: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value @ Value::Object(_)) => value,
        _ => empty_record(),
    }
}

fn empty_record() -> Value {
    Value::Object(Map::new())
}

fn log_response(request: &ParsedRequest, response: &HandlerResponse) {
    let method = request.method.to_uppercase();
    let path = format!("/{}", request.path);
    let status = response.status.as_u16();

    if response.status.is_success() {
        tracing::info!(method = %method, path = %path, status, "Request handled");
    } else {
        tracing::warn!(method = %method, path = %path, status, "Request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_tokens() {
        assert_eq!(Method::from_token("post"), Some(Method::Post));
        assert_eq!(Method::from_token("delete"), Some(Method::Del));
        assert_eq!(Method::from_token("del"), None);
        assert_eq!(Method::from_token("patch"), None);
    }

    #[test]
    fn test_trim_path() {
        assert_eq!(trim_path("/users/"), "users");
        assert_eq!(trim_path("///tokens"), "tokens");
        assert_eq!(trim_path("/"), "");
        assert_eq!(trim_path("/api/users/"), "api/users");
    }

    #[test]
    fn test_parse_body_is_permissive() {
        assert_eq!(parse_body(b""), json!({}));
        assert_eq!(parse_body(b"{broken"), json!({}));
        assert_eq!(parse_body(b"[1,2]"), json!({}));
        assert_eq!(parse_body(b"\"text\""), json!({}));
        assert_eq!(parse_body(br#"{"phone":"5551234567"}"#), json!({"phone": "5551234567"}));
    }

    #[tokio::test]
    async fn test_parse_request() {
        let request = Request::builder()
            .method("PUT")
            .uri("/users/?phone=5551234567&x=1")
            .header("token", "abc")
            .body(Body::from(r#"{"firstName":"Ada"}"#))
            .unwrap();

        let parsed = parse_request(request).await;
        assert_eq!(parsed.path, "users");
        assert_eq!(parsed.method, "put");
        assert_eq!(parsed.method(), Some(Method::Put));
        assert_eq!(parsed.query_param("phone"), Some("5551234567"));
        assert_eq!(parsed.header("token"), Some("abc"));
        assert_eq!(parsed.body, json!({"firstName": "Ada"}));
    }

    #[tokio::test]
    async fn test_parse_request_without_query_or_body() {
        let request = Request::builder()
            .method("GET")
            .uri("/ping")
            .body(Body::empty())
            .unwrap();

        let parsed = parse_request(request).await;
        assert!(parsed.query.is_empty());
        assert_eq!(parsed.body, json!({}));
        assert!(parsed.header("token").is_none());
    }
}
