//! Bearer authentication and the login/token endpoints
//!
//! Protected routes run behind [`auth_middleware`], which verifies an
//! access token and places the caller in request extensions as
//! [`CurrentUser`].

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use status_common::api::{issue_token, verify_password, verify_token, Claims, TokenKind};
use status_common::models::{MembershipStatus, Role, Team, User};
use status_common::time;
use tracing::{debug, info};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Team the token is scoped to; `None` for password logins
    pub team_id: Option<String>,
}

impl CurrentUser {
    /// Fail unless the caller has the MANAGER role
    pub fn require_manager(&self) -> ApiResult<()> {
        if self.user.role == Role::Manager {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Manager role required".to_string()))
        }
    }
}

/// Load a team the caller manages
///
/// Unknown teams are 404 before any permission check.
pub async fn require_team_manager(state: &AppState, current: &CurrentUser, team_id: &str) -> ApiResult<Team> {
    let team = db::teams::get_team(&state.db, team_id).await?;
    current.require_manager()?;
    if team.manager_id != current.user.id {
        return Err(ApiError::Forbidden("Not authorized to modify this team".to_string()));
    }
    Ok(team)
}

/// Load a team the caller manages or actively belongs to
pub async fn require_team_access(state: &AppState, current: &CurrentUser, team_id: &str) -> ApiResult<Team> {
    let team = db::teams::get_team(&state.db, team_id).await?;
    if team.manager_id == current.user.id {
        return Ok(team);
    }

    let membership = db::teams::find_membership(&state.db, team_id, &current.user.id).await?;
    match membership {
        Some(m) if m.status == MembershipStatus::Active => Ok(team),
        _ => Err(ApiError::Forbidden("Not a member of this team".to_string())),
    }
}

/// Verify the bearer access token and attach [`CurrentUser`]
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = verify_token(token.trim(), &state.token_secret, time::now())?;
    claims.require_kind(TokenKind::Access)?;

    let user = db::users::find_by_id(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    debug!(user_id = %user.id, "Authenticated request");
    request.extensions_mut().insert(CurrentUser {
        user,
        team_id: claims.team_id,
    });

    Ok(next.run(request).await)
}

// ========================================
// Token endpoints
// ========================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn issue_pair(state: &AppState, user_id: &str, now: DateTime<Utc>) -> TokenPair {
    let auth = &state.settings.auth;
    let access = Claims::new(
        user_id,
        TokenKind::Access,
        None,
        auth.access_token_ttl(),
        now,
    );
    let refresh = Claims::new(
        user_id,
        TokenKind::Refresh,
        None,
        auth.refresh_token_ttl(),
        now,
    );

    TokenPair {
        access_token: issue_token(&access, &state.token_secret),
        token_type: "bearer".to_string(),
        refresh_token: issue_token(&refresh, &state.token_secret),
    }
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    state.login_limiter.check(&req.email)?;

    let invalid = || ApiError::Unauthorized("Incorrect email or password".to_string());

    let mut conn = state.db.acquire().await?;
    let user = db::users::find_by_email(&mut conn, req.email.trim())
        .await?
        .ok_or_else(invalid)?;
    drop(conn);

    match (&user.password_hash, &user.password_salt) {
        (Some(hash), Some(salt)) if verify_password(&req.password, hash, salt) => {}
        _ => return Err(invalid()),
    }

    let now = time::now();
    db::users::touch_last_active(&state.db, &user.id, now).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(issue_pair(&state, &user.id, now)))
}

/// POST /api/v1/auth/token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let now = time::now();
    let claims = verify_token(&req.refresh_token, &state.token_secret, now)?;
    claims.require_kind(TokenKind::Refresh)?;

    let user = db::users::find_by_id(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(issue_pair(&state, &user.id, now)))
}

/// POST /api/v1/auth/logout
///
/// Tokens are stateless; the client discards them.
pub async fn logout(Extension(current): Extension<CurrentUser>) -> Json<MessageResponse> {
    info!(user_id = %current.user.id, "User logged out");
    Json(MessageResponse {
        message: "Successfully logged out".to_string(),
    })
}

/// GET /api/v1/auth/me
pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}
