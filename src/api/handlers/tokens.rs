use serde_json::Value;

use super::HandlerResult;
use crate::api::dispatcher::{Method, ParsedRequest};
use crate::api::response::{ApiError, HandlerResponse};
use crate::validation::normalize;
use crate::AppState;

pub async fn handle(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    match request.method() {
        Some(Method::Post) => post(state, request).await,
        Some(Method::Get) => get(state, request).await,
        Some(Method::Put) => put(state, request).await,
        Some(Method::Del) => del(state, request).await,
        None => Err(ApiError::method_not_allowed()),
    }
}

/// Log in. Required: phone, password.
async fn post(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    let fields = normalize(request.body.clone());
    let phone = fields.get("phone").and_then(Value::as_str).unwrap_or_default();
    let password = fields
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let token = state.tokens.issue(phone, password).await?;
    Ok(HandlerResponse::ok(token))
}

/// Required: `id` query parameter.
async fn get(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    let id = request.query_param("id").unwrap_or_default();
    let token = state.tokens.fetch(id).await?;
    Ok(HandlerResponse::ok(token))
}

/// Required: `id` and `extend: true` in the body.
async fn put(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    let fields = normalize(request.body.clone());
    let id = fields.get("id").and_then(Value::as_str).unwrap_or_default();
    if fields.get("extend") != Some(&Value::Bool(true)) {
        return Err(ApiError::bad_request(
            "Missing required field(s) or field(s) are invalid",
        ));
    }

    let token = state.tokens.extend(id).await?;
    Ok(HandlerResponse::ok(token))
}

/// Required: `id` query parameter.
async fn del(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    let id = request.query_param("id").unwrap_or_default();
    state.tokens.revoke(id).await?;
    Ok(HandlerResponse::message("Token deleted successfully"))
}
