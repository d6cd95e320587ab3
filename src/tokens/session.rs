use chrono::{Duration, Utc};
use thiserror::Error;

use crate::config::MAX_TTL_SECONDS;
use crate::storage::models::Token;
use crate::storage::{is_valid_key, Collection, Listing, StoreError};
use crate::users::{UserError, UserRepository};
use crate::validation::{has_length, is_valid_phone};

use super::generator::{generate_token_id, TOKEN_ID_LENGTH};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("The token has already expired and cannot be extended")]
    Expired,
    #[error("{0}")]
    Internal(String),
    #[error("Specified token does not exist")]
    NotFound,
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Password did not match the specified user's stored password")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
}

impl From<UserError> for TokenError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound => TokenError::NotFound,
            UserError::Unauthorized => TokenError::Unauthorized,
            UserError::Validation(msg) => TokenError::Validation(msg),
            UserError::Store(e) => TokenError::Store(e),
            other => TokenError::Internal(other.to_string()),
        }
    }
}

/// Issues, looks up, extends and revokes bearer tokens in the `tokens`
/// collection.
///
/// Expiry is checked lazily: expired tokens stay on disk until revoked or
/// removed by [`TokenManager::cleanup_expired`].
#[derive(Debug, Clone)]
pub struct TokenManager {
    tokens: Collection<Token>,
    ttl: Duration,
    users: UserRepository,
}

impl TokenManager {
    pub fn new(tokens: Collection<Token>, users: UserRepository, ttl_seconds: u64) -> Self {
        Self {
            tokens,
            ttl: Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64),
            users,
        }
    }

    fn expiry_from_now(&self) -> i64 {
        (Utc::now() + self.ttl).timestamp_millis()
    }

    /// Issue a token for a user whose password checks out.
    pub async fn issue(&self, phone: &str, password: &str) -> Result<Token, TokenError> {
        let phone = phone.trim();
        if !is_valid_phone(phone) || password.is_empty() {
            return Err(TokenError::Validation(
                "Missing required field(s)".to_string(),
            ));
        }

        self.users.verify_credentials(phone, password).await?;

        let token = Token {
            expires: self.expiry_from_now(),
            phone: phone.to_string(),
            token_id: generate_token_id(TOKEN_ID_LENGTH),
        };

        self.tokens.create(&token.token_id, &token).await?;
        tracing::debug!(phone = %phone, "Issued token");

        Ok(token)
    }

    /// Look up a token. Expired tokens are returned as-is.
    pub async fn fetch(&self, token_id: &str) -> Result<Token, TokenError> {
        let token_id = checked_token_id(token_id)?;
        self.tokens.read(token_id).await.map_err(not_found_or_store)
    }

    /// Push the expiry of a live token one TTL past now.
    pub async fn extend(&self, token_id: &str) -> Result<Token, TokenError> {
        let mut token = self.fetch(token_id).await?;

        if token.is_expired() {
            return Err(TokenError::Expired);
        }

        // Strictly later than the previous expiry, even within the same millisecond.
        token.expires = self.expiry_from_now().max(token.expires.saturating_add(1));
        self.tokens
            .update(&token.token_id, &token)
            .await
            .map_err(not_found_or_store)?;

        tracing::debug!(token_id = %token.token_id, expires = token.expires, "Extended token");
        Ok(token)
    }

    pub async fn revoke(&self, token_id: &str) -> Result<(), TokenError> {
        let token_id = checked_token_id(token_id)?;
        self.tokens
            .delete(token_id)
            .await
            .map_err(not_found_or_store)?;
        tracing::debug!(token_id = %token_id, "Revoked token");
        Ok(())
    }

    /// True only if the token exists, belongs to `phone` and has not expired.
    pub async fn verify(&self, token_id: &str, phone: &str) -> bool {
        match self.fetch(token_id).await {
            Ok(token) => token.phone == phone && !token.is_expired(),
            Err(_) => false,
        }
    }

    /// Revoke every token owned by `phone`. Returns how many were removed.
    pub async fn revoke_all_for(&self, phone: &str) -> Result<usize, TokenError> {
        let mut revoked = 0;
        for token in self.load_all().await? {
            if token.phone == phone && self.tokens.delete(&token.token_id).await.is_ok() {
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    /// Delete every expired token (called by the background sweep).
    pub async fn cleanup_expired(&self) -> Result<usize, TokenError> {
        let now = Utc::now().timestamp_millis();
        let mut cleaned = 0;

        for token in self.load_all().await? {
            if token.is_expired_at(now) && self.tokens.delete(&token.token_id).await.is_ok() {
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            tracing::info!(count = cleaned, "Cleaned up expired tokens");
        }

        Ok(cleaned)
    }

    async fn load_all(&self) -> Result<Vec<Token>, TokenError> {
        let mut tokens = Vec::new();
        if let Listing::Keys(keys) = self.tokens.list().await? {
            for key in keys {
                match self.tokens.read(&key).await {
                    // Files that no longer parse keep their key so they can still be swept.
                    Ok(token) if token.token_id.is_empty() => tokens.push(Token {
                        token_id: key,
                        ..token
                    }),
                    Ok(token) => tokens.push(token),
                    Err(e) => tracing::debug!(key = %key, error = %e, "Skipping unreadable token"),
                }
            }
        }
        Ok(tokens)
    }
}

fn checked_token_id(token_id: &str) -> Result<&str, TokenError> {
    let token_id = token_id.trim();
    if has_length(token_id, TOKEN_ID_LENGTH) && is_valid_key(token_id) {
        Ok(token_id)
    } else {
        Err(TokenError::Validation(
            "Missing required field or field is invalid".to_string(),
        ))
    }
}

fn not_found_or_store(e: StoreError) -> TokenError {
    match e {
        StoreError::InvalidKey(_) => {
            TokenError::Validation("Missing required field or field is invalid".to_string())
        }
        StoreError::NotFound(_) => TokenError::NotFound,
        other => TokenError::Store(other),
    }
}
