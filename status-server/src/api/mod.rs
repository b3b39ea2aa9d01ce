//! HTTP API handlers for status-server

pub mod admin;
pub mod auth;
pub mod health;
pub mod magic_links;
pub mod submissions;
pub mod summaries;
pub mod teams;
pub mod users;

pub use auth::{auth_middleware, login, logout, me, refresh_token, CurrentUser};
pub use health::health_routes;
pub use magic_links::{create_magic_link, exchange_magic_link};
pub use submissions::create_submission;
pub use summaries::{generate_summary, get_summary, list_summaries};
pub use teams::{add_members, create_team, list_timezones, update_schedule};
pub use users::get_user;
