mod collection;
pub mod models;

pub use collection::{is_valid_key, Collection, Listing, Record, StoreError, RECORD_EXTENSION};
