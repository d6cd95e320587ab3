use std::sync::Arc;

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Characters a token identifier is drawn from.
const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a token identifier.
pub const TOKEN_ID_LENGTH: usize = 20;

/// Generate a random identifier of `len` characters from `[a-z0-9]`.
pub fn generate_token_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Keyed password digest (HMAC-SHA256, hex encoded).
///
/// There is no salt: the same password and secret always produce the same
/// digest, which is what lets a login compare digests directly.
#[derive(Clone)]
pub struct PasswordHasher {
    secret: Arc<[u8]>,
}

impl PasswordHasher {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret.as_bytes()),
        }
    }

    /// Hash a password. Returns `None` for an empty password.
    pub fn hash(&self, password: &str) -> Option<String> {
        if password.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(password.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a plaintext password against a stored digest.
    pub fn matches(&self, password: &str, digest: &str) -> bool {
        self.hash(password).is_some_and(|h| h == digest)
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_id() {
        let id = generate_token_id(TOKEN_ID_LENGTH);
        assert_eq!(id.len(), 20);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

        // Ensure randomness
        assert_ne!(id, generate_token_id(TOKEN_ID_LENGTH));
    }

    #[test]
    fn test_generate_token_id_zero_length() {
        assert!(generate_token_id(0).is_empty());
    }

    #[test]
    fn test_hash_is_deterministic_and_keyed() {
        let hasher = PasswordHasher::new("secret-a");
        let h1 = hasher.hash("hunter2").unwrap();
        assert_eq!(h1, hasher.hash("hunter2").unwrap());
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, hasher.hash("hunter3").unwrap());

        let other = PasswordHasher::new("secret-b");
        assert_ne!(h1, other.hash("hunter2").unwrap());
    }

    #[test]
    fn test_hash_matches_known_vector() {
        // HMAC-SHA256(key = "key", msg = "The quick brown fox jumps over the lazy dog")
        let hasher = PasswordHasher::new("key");
        assert_eq!(
            hasher
                .hash("The quick brown fox jumps over the lazy dog")
                .unwrap(),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_empty_password_has_no_hash() {
        let hasher = PasswordHasher::new("secret");
        assert!(hasher.hash("").is_none());
        assert!(!hasher.matches("", ""));
    }
}
