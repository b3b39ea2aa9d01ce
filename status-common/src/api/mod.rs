//! API module for shared authentication functionality
//!
//! Contains ONLY pure functions, database operations (via sqlx) and shared
//! types. The server crate wraps these in axum extractors.

pub mod auth;

pub use auth::{
    hash_password, issue_token, verify_password, verify_token, Claims, TokenError, TokenKind,
};
#[cfg(feature = "sqlx")]
pub use auth::{initialize_token_secret, load_token_secret};
