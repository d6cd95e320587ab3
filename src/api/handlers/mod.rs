pub mod tokens;
pub mod users;

use crate::api::dispatcher::ParsedRequest;
use crate::api::response::{ApiError, HandlerResponse};
use crate::tokens::TokenError;
use crate::users::UserError;
use crate::AppState;

pub type HandlerResult = Result<HandlerResponse, ApiError>;

/// Header carrying the caller's bearer token.
pub const TOKEN_HEADER: &str = "token";

pub async fn ping() -> HandlerResult {
    Ok(HandlerResponse::message("pong"))
}

pub async fn not_found() -> HandlerResult {
    Err(ApiError::not_found("Not found"))
}

/// Require a `token` header that is live and belongs to `phone`.
async fn require_token(
    state: &AppState,
    request: &ParsedRequest,
    phone: &str,
) -> Result<(), ApiError> {
    let token_id = request
        .header(TOKEN_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Missing required token in header"))?;

    if state.tokens.verify(token_id, phone).await {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Token is invalid or has expired"))
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::Conflict
            | UserError::NotFound
            | UserError::Unauthorized
            | UserError::Validation(_) => ApiError::bad_request(e.to_string()),
            UserError::Internal(_) | UserError::Store(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired
            | TokenError::NotFound
            | TokenError::Unauthorized
            | TokenError::Validation(_) => ApiError::bad_request(e.to_string()),
            TokenError::Internal(_) | TokenError::Store(_) => ApiError::internal(e.to_string()),
        }
    }
}
