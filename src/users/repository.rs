use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::storage::models::User;
use crate::storage::{Collection, StoreError};
use crate::tokens::generator::PasswordHasher;
use crate::validation::{is_valid_phone, non_empty_str, normalize};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("A user with that phone number already exists")]
    Conflict,
    #[error("{0}")]
    Internal(String),
    #[error("Specified user does not exist")]
    NotFound,
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Password did not match the specified user's stored password")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
}

/// A user as shown to callers: every field except the password digest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub tos_agreement: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            tos_agreement: user.tos_agreement,
        }
    }
}

/// Validates, hashes and persists users in the `users` collection.
#[derive(Debug, Clone)]
pub struct UserRepository {
    hasher: PasswordHasher,
    users: Collection<User>,
}

impl UserRepository {
    pub fn new(users: Collection<User>, hasher: PasswordHasher) -> Self {
        Self { hasher, users }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Create a user from a signup payload.
    pub async fn register(&self, payload: Value) -> Result<UserProfile, UserError> {
        let fields = normalize(payload);

        let first_name = non_empty_str(&fields, "firstName");
        let last_name = non_empty_str(&fields, "lastName");
        let phone = fields
            .get("phone")
            .and_then(Value::as_str)
            .filter(|p| is_valid_phone(p));
        let password = non_empty_str(&fields, "password");
        let tos_agreement = fields.get("tosAgreement") == Some(&Value::Bool(true));

        let (Some(first_name), Some(last_name), Some(phone), Some(password), true) =
            (first_name, last_name, phone, password, tos_agreement)
        else {
            return Err(UserError::Validation("Missing required fields".to_string()));
        };

        if self.users.exists(phone).await {
            return Err(UserError::Conflict);
        }

        let password = self
            .hasher
            .hash(password)
            .ok_or_else(|| UserError::Internal("Could not hash the user's password".to_string()))?;

        let user = User {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password,
            phone: phone.to_string(),
            tos_agreement,
        };

        self.users.create(phone, &user).await.map_err(|e| match e {
            StoreError::AlreadyExists(_) => UserError::Conflict,
            other => not_found_or_store(other),
        })?;

        tracing::debug!(phone = %phone, "Registered user");
        Ok(user.into())
    }

    pub async fn fetch(&self, phone: &str) -> Result<UserProfile, UserError> {
        let phone = checked_phone(phone)?;
        let user = self.load(phone).await?;
        Ok(user.into())
    }

    /// Merge non-empty `firstName`, `lastName` and `password` fields into an
    /// existing user. The whole record is rewritten.
    pub async fn modify(&self, phone: &str, changes: Value) -> Result<UserProfile, UserError> {
        let phone = checked_phone(phone)?;
        let fields = normalize(changes);

        let first_name = non_empty_str(&fields, "firstName");
        let last_name = non_empty_str(&fields, "lastName");
        let password = non_empty_str(&fields, "password");

        if first_name.is_none() && last_name.is_none() && password.is_none() {
            return Err(UserError::Validation("Missing fields to update".to_string()));
        }

        let mut user = self.load(phone).await?;

        if let Some(first_name) = first_name {
            user.first_name = first_name.to_string();
        }
        if let Some(last_name) = last_name {
            user.last_name = last_name.to_string();
        }
        if let Some(password) = password {
            user.password = self.hasher.hash(password).ok_or_else(|| {
                UserError::Internal("Could not hash the user's password".to_string())
            })?;
        }

        self.users.update(phone, &user).await.map_err(not_found_or_store)?;

        tracing::debug!(phone = %phone, "Updated user");
        Ok(user.into())
    }

    pub async fn remove(&self, phone: &str) -> Result<(), UserError> {
        let phone = checked_phone(phone)?;
        self.users.delete(phone).await.map_err(not_found_or_store)?;
        tracing::debug!(phone = %phone, "Deleted user");
        Ok(())
    }

    /// Check a plaintext password against the stored digest for `phone`.
    pub async fn verify_credentials(&self, phone: &str, password: &str) -> Result<(), UserError> {
        let phone = checked_phone(phone)?;
        let user = self.load(phone).await?;
        if self.hasher.matches(password, &user.password) {
            Ok(())
        } else {
            Err(UserError::Unauthorized)
        }
    }

    async fn load(&self, phone: &str) -> Result<User, UserError> {
        self.users.read(phone).await.map_err(not_found_or_store)
    }
}

fn checked_phone(phone: &str) -> Result<&str, UserError> {
    let phone = phone.trim();
    if is_valid_phone(phone) {
        Ok(phone)
    } else {
        Err(UserError::Validation(
            "Digits length of 'phone' field isn't 10".to_string(),
        ))
    }
}

fn not_found_or_store(e: StoreError) -> UserError {
    match e {
        StoreError::InvalidKey(_) => {
            UserError::Validation("Digits length of 'phone' field isn't 10".to_string())
        }
        StoreError::NotFound(_) => UserError::NotFound,
        other => UserError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{setup_users, signup_payload};
    use serde_json::json;

    #[tokio::test]
    async fn test_register_then_fetch_hides_password() {
        let (repo, _temp) = setup_users().await;

        let created = repo.register(signup_payload("5551234567")).await.unwrap();
        let fetched = repo.fetch("5551234567").await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.first_name, "Ada");
        assert_eq!(fetched.last_name, "Lovelace");

        let value = serde_json::to_value(&fetched).unwrap();
        assert!(value.get("password").is_none());
    }

    #[tokio::test]
    async fn test_register_trims_fields_and_hashes_password() {
        let (repo, temp) = setup_users().await;

        repo.register(json!({
            "firstName": "  Ada ",
            "lastName": " Lovelace",
            "phone": " 5551234567 ",
            "password": " hunter2 ",
            "tosAgreement": true,
        }))
        .await
        .unwrap();

        let raw = std::fs::read_to_string(temp.path().join("users/5551234567.json")).unwrap();
        let stored: User = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.first_name, "Ada");
        assert_eq!(stored.password, repo.hasher().hash("hunter2").unwrap());
        assert!(!raw.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict_and_keeps_original() {
        let (repo, _temp) = setup_users().await;
        repo.register(signup_payload("5551234567")).await.unwrap();

        let mut second = signup_payload("5551234567");
        second["firstName"] = json!("Mallory");
        let err = repo.register(second).await.unwrap_err();
        assert!(matches!(err, UserError::Conflict));

        let fetched = repo.fetch("5551234567").await.unwrap();
        assert_eq!(fetched.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_payloads() {
        let (repo, _temp) = setup_users().await;

        let cases = [
            ("firstName", json!("   ")),
            ("lastName", json!("")),
            ("phone", json!("555123")),
            ("password", json!("")),
            ("tosAgreement", json!(false)),
            ("tosAgreement", json!("true")),
        ];
        for (field, value) in cases {
            let mut payload = signup_payload("5551234567");
            payload[field] = value;
            assert!(
                matches!(repo.register(payload).await, Err(UserError::Validation(_))),
                "{field} should be rejected"
            );
        }
        assert!(matches!(
            repo.register(json!("not an object")).await,
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            repo.fetch("5551234567").await,
            Err(UserError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_bad_phone_fails_before_storage() {
        let (repo, _temp) = setup_users().await;

        for phone in ["", "123", "12345678901", "../../etc/x", "555/123456", "5551..4567"] {
            assert!(matches!(repo.fetch(phone).await, Err(UserError::Validation(_))));
            assert!(matches!(
                repo.modify(phone, json!({"firstName": "X"})).await,
                Err(UserError::Validation(_))
            ));
            assert!(matches!(repo.remove(phone).await, Err(UserError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_register_with_path_like_phone_is_a_validation_error() {
        let (repo, temp) = setup_users().await;

        for phone in ["555/123456", "5551..4567", "555\\123456"] {
            assert!(
                matches!(
                    repo.register(signup_payload(phone)).await,
                    Err(UserError::Validation(_))
                ),
                "{phone:?} should be rejected"
            );
        }
        assert!(!temp.path().join("users/555").exists());
    }

    #[tokio::test]
    async fn test_record_missing_a_field_keeps_the_rest() {
        let (repo, temp) = setup_users().await;
        let digest = repo.hasher().hash("hunter2").unwrap();
        std::fs::write(
            temp.path().join("users/5551234567.json"),
            format!(
                r#"{{"firstName":"Ada","lastName":"L","phone":"5551234567","password":"{digest}"}}"#
            ),
        )
        .unwrap();

        let fetched = repo.fetch("5551234567").await.unwrap();
        assert_eq!(fetched.first_name, "Ada");
        assert_eq!(fetched.last_name, "L");
        assert_eq!(fetched.phone, "5551234567");
        assert!(!fetched.tos_agreement);

        let updated = repo
            .modify("5551234567", json!({"lastName": "Lovelace"}))
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.phone, "5551234567");
        repo.verify_credentials("5551234567", "hunter2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_modify_merges_fields_and_rehashes_password() {
        let (repo, _temp) = setup_users().await;
        repo.register(signup_payload("5551234567")).await.unwrap();

        let updated = repo
            .modify("5551234567", json!({"lastName": " Byron ", "password": "new-pass"}))
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Byron");

        repo.verify_credentials("5551234567", "new-pass")
            .await
            .unwrap();
        assert!(matches!(
            repo.verify_credentials("5551234567", "hunter2").await,
            Err(UserError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_modify_requires_a_field_and_an_existing_user() {
        let (repo, _temp) = setup_users().await;

        assert!(matches!(
            repo.modify("5551234567", json!({"firstName": "  "})).await,
            Err(UserError::Validation(_))
        ));
        assert!(matches!(
            repo.modify("5551234567", json!({"firstName": "Ada"})).await,
            Err(UserError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let (repo, _temp) = setup_users().await;
        repo.register(signup_payload("5551234567")).await.unwrap();

        repo.remove("5551234567").await.unwrap();
        assert!(matches!(
            repo.fetch("5551234567").await,
            Err(UserError::NotFound)
        ));
        assert!(matches!(
            repo.remove("5551234567").await,
            Err(UserError::NotFound)
        ));
    }
}
