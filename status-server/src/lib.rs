//! status-server library - weekly status reporting service
//!
//! Managers create teams and prompt schedules, members submit weekly
//! updates, and a language model summarizes each team's week once everyone
//! has reported or the submission window times out.

use axum::http::HeaderValue;
use axum::Router;
use sqlx::SqlitePool;
use status_common::config::Settings;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use error::{ApiError, ApiResult};

use services::{LoginRateLimiter, SqliteSummaryStore, Summarizer, SummaryService};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub settings: Arc<Settings>,
    /// Token signing secret
    pub token_secret: Arc<str>,
    pub summaries: Arc<SummaryService>,
    pub login_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    /// Create application state with SQLite-backed summary storage
    pub fn new(
        db: SqlitePool,
        settings: Settings,
        token_secret: String,
        summarizer: Arc<dyn Summarizer>,
    ) -> status_common::Result<Self> {
        let store = Arc::new(SqliteSummaryStore::new(db.clone()));
        let login_limiter = LoginRateLimiter::new(&settings.rate_limit)?;

        Ok(Self {
            db,
            settings: Arc::new(settings),
            token_secret: Arc::from(token_secret),
            summaries: Arc::new(SummaryService::new(store, summarizer)),
            login_limiter: Arc::new(login_limiter),
        })
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Ignoring invalid CORS origin: {}", origin);
            layer
        }
    }
}

/// Build application router
///
/// Health, login, token refresh, magic-link exchange and the timezone list
/// are public; everything else requires a bearer access token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/v1/auth/logout", post(api::logout))
        .route("/api/v1/auth/me", get(api::me))
        // Both magic-link routes must share the first parameter name
        .route("/api/v1/magic-links/:id/:email", post(api::create_magic_link))
        .route("/api/v1/users/:user_id", get(api::get_user))
        .route("/api/v1/team", post(api::create_team))
        .route("/api/v1/team/:team_id/members", post(api::add_members))
        .route("/api/v1/team/:team_id/schedule", put(api::update_schedule))
        .route("/api/v1/submissions", post(api::create_submission))
        .route("/api/v1/summaries/:team_id", get(api::list_summaries))
        .route("/api/v1/summaries/:team_id/generate", post(api::generate_summary))
        .route("/api/v1/summaries/:team_id/:week_start_date", get(api::get_summary))
        .route("/api/v1/admin/users", get(api::admin::list_users))
        .route("/api/v1/admin/teams", get(api::admin::list_teams))
        .route("/api/v1/admin/teams/:team_id", get(api::admin::get_team))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/v1/auth/login", post(api::login))
        .route("/api/v1/auth/token", post(api::refresh_token))
        .route("/api/v1/magic-links/:id", get(api::exchange_magic_link))
        .route("/api/v1/team/timezones", get(api::list_timezones))
        .merge(api::health_routes());

    let cors = cors_layer(&state.settings.cors_origin);

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
