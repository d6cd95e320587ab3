//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, Environment, SecurityConfig, ServerConfig, TokenConfig};
use crate::storage::models::{Token, User};
use crate::storage::Collection;
use crate::tokens::{PasswordHasher, TokenManager};
use crate::users::UserRepository;
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "hunter2";

/// Open a fresh user repository in a temporary directory.
///
/// Returns both the repository and the `TempDir` guard — the caller must
/// keep the `TempDir` alive for the duration of the test.
pub async fn setup_users() -> (UserRepository, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let users = Collection::<User>::open(temp_dir.path()).await.unwrap();
    (
        UserRepository::new(users, PasswordHasher::new(TEST_SECRET)),
        temp_dir,
    )
}

/// A user repository plus a token manager (one-hour TTL) sharing one data dir.
pub async fn setup_tokens() -> (UserRepository, TokenManager, TempDir) {
    let (users, temp_dir) = setup_users().await;
    let tokens = Collection::<Token>::open(temp_dir.path()).await.unwrap();
    let manager = TokenManager::new(tokens, users.clone(), 3600);
    (users, manager, temp_dir)
}

/// A valid signup payload for `phone` with password [`TEST_PASSWORD`].
pub fn signup_payload(phone: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "phone": phone,
        "password": TEST_PASSWORD,
        "tosAgreement": true,
    })
}

/// A minimal `Config` suitable for unit tests.
pub fn test_config(data_dir: &Path) -> Config {
    Config {
        environment: Environment::Staging,
        security: SecurityConfig {
            hashing_secret: TEST_SECRET.to_string(),
        },
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().into_owned(),
        },
        tokens: TokenConfig::default(),
    }
}

/// Build a full `Arc<AppState>` from the given config.
pub async fn test_state(config: Config) -> Arc<AppState> {
    Arc::new(AppState::open(config).await.unwrap())
}
