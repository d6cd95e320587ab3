//! token-service - A small HTTP service for users and bearer tokens
//!
//! This crate provides:
//! - A file-per-record store, one directory per collection
//! - User signup, lookup, update and deletion with HMAC-SHA256 password digests
//! - Opaque, time-limited bearer tokens tied to a user's phone number
//! - A static path → resource dispatcher serving JSON over HTTP

pub mod api;
pub mod config;
pub mod expiration;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod tokens;
pub mod users;
pub mod validation;

use config::Config;
use storage::models::{Token, User};
use storage::{Collection, StoreError};
use tokens::{PasswordHasher, TokenManager};
use users::UserRepository;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub routes: api::RouteTable,
    pub tokens: TokenManager,
    pub users: UserRepository,
}

impl AppState {
    /// Open the `users` and `tokens` collections under the configured data
    /// directory and wire the services on top of them.
    pub async fn open(config: Config) -> Result<Self, StoreError> {
        let hasher = PasswordHasher::new(&config.security.hashing_secret);

        let users = UserRepository::new(
            Collection::<User>::open(&config.server.data_dir).await?,
            hasher,
        );
        let tokens = TokenManager::new(
            Collection::<Token>::open(&config.server.data_dir).await?,
            users.clone(),
            config.tokens.ttl_seconds,
        );

        Ok(Self {
            config,
            routes: api::RouteTable::new(),
            tokens,
            users,
        })
    }
}
