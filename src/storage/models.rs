use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::collection::Record;

/// A registered user, keyed by phone number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    /// HMAC-SHA256 hex digest, never the plaintext
    pub password: String,
    /// 10 characters, doubles as the record key
    pub phone: String,
    pub tos_agreement: bool,
}

impl Record for User {
    const COLLECTION: &'static str = "users";
}

/// A bearer token, keyed by its random identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Token {
    /// Absolute expiry in milliseconds since the Unix epoch
    pub expires: i64,
    /// Phone of the owning user
    pub phone: String,
    pub token_id: String,
}

impl Token {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires <= now_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}

impl Record for Token {
    const COLLECTION: &'static str = "tokens";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serializes_with_camel_case_fields() {
        let user = User {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "digest".to_string(),
            phone: "5551234567".to_string(),
            tos_agreement: true,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["tosAgreement"], true);
    }

    #[test]
    fn test_missing_fields_default_individually() {
        let user: User = serde_json::from_str(
            r#"{"firstName":"Ada","lastName":"L","phone":"5551234567","password":"x"}"#,
        )
        .unwrap();
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.password, "x");
        assert!(!user.tos_agreement);

        let token: Token = serde_json::from_str(r#"{"phone":"5551234567"}"#).unwrap();
        assert_eq!(token.phone, "5551234567");
        assert_eq!(token.expires, 0);
        assert!(token.token_id.is_empty());
    }

    #[test]
    fn test_token_expiry_boundary() {
        let token = Token {
            expires: 1_000,
            phone: "5551234567".to_string(),
            token_id: "a".repeat(20),
        };
        assert!(!token.is_expired_at(999));
        assert!(token.is_expired_at(1_000));
        assert!(token.is_expired_at(1_001));
    }
}
