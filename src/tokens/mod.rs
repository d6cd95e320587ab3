pub mod generator;
pub mod session;

pub use generator::{generate_token_id, PasswordHasher, TOKEN_ID_LENGTH};
pub use session::{TokenError, TokenManager};
