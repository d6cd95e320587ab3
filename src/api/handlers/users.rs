use serde_json::Value;

use super::{require_token, HandlerResult};
use crate::api::dispatcher::{Method, ParsedRequest};
use crate::api::response::{ApiError, HandlerResponse};
use crate::validation::is_valid_phone;
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

/// Sign up. Required: firstName, lastName, phone, password, tosAgreement.
async fn post(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    let profile = state.users.register(request.body.clone()).await?;
    Ok(HandlerResponse::ok(profile))
}

/// Required: `phone` query parameter and a matching `token` header.
async fn get(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    let phone = phone_from_query(request)?;
    require_token(state, request, phone).await?;

    let profile = state.users.fetch(phone).await?;
    Ok(HandlerResponse::ok(profile))
}

/// Required: `phone` in the body and a matching `token` header.
/// At least one of firstName, lastName, password must be set.
async fn put(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    let phone = request
        .body
        .get("phone")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| is_valid_phone(p))
        .ok_or_else(|| ApiError::bad_request("Missing required field"))?;
    require_token(state, request, phone).await?;

    let profile = state.users.modify(phone, request.body.clone()).await?;
    Ok(HandlerResponse::ok(profile))
}

/// Required: `phone` query parameter and a matching `token` header.
/// The user's tokens are revoked along with the account.
async fn del(state: &AppState, request: &ParsedRequest) -> HandlerResult {
    let phone = phone_from_query(request)?;
    require_token(state, request, phone).await?;

    state.users.remove(phone).await?;

    match state.tokens.revoke_all_for(phone).await {
        Ok(count) => tracing::debug!(phone = %phone, count, "Revoked tokens of deleted user"),
        Err(e) => {
            tracing::warn!(phone = %phone, error = %e, "Failed to revoke tokens of deleted user")
        }
    }

    Ok(HandlerResponse::message("User deleted successfully"))
}

fn phone_from_query(request: &ParsedRequest) -> Result<&str, ApiError> {
    let phone = request
        .query_param("phone")
        .ok_or_else(|| ApiError::bad_request("Missing required fields"))?;
    if !is_valid_phone(phone) {
        return Err(ApiError::bad_request(
            "Digits length of 'phone' field isn't 10",
        ));
    }
    Ok(phone)
}
