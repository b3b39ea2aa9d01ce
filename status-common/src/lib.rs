//! # Speedy Status Common Library
//!
//! Shared code for the status reporting service:
//! - Lateness and summary-trigger decisions
//! - Week and timezone arithmetic
//! - Database models and schema initialization
//! - Signed tokens and password hashing
//! - Configuration loading

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod lateness;
pub mod models;
pub mod time;
pub mod trigger;

pub use error::{Error, Result};
pub use lateness::is_late;
pub use trigger::{should_generate_summary, trigger_reason, TriggerReason};
