pub mod repository;

pub use repository::{UserError, UserProfile, UserRepository};
