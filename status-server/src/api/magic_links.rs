//! Magic links: passwordless, team-scoped submission access

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use status_common::api::{issue_token, verify_token, Claims, TokenKind};
use status_common::models::MembershipStatus;
use status_common::time;
use tracing::{info, warn};

use super::auth::{require_team_manager, CurrentUser};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MagicLinkResponse {
    pub magic_link: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionToken {
    pub access_token: String,
    pub token_type: String,
}

/// POST /api/v1/magic-links/:team_id/:email
pub async fn create_magic_link(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((team_id, email)): Path<(String, String)>,
) -> ApiResult<Json<MagicLinkResponse>> {
    require_team_manager(&state, &current, &team_id).await?;

    let (user, _) = db::teams::find_member_by_email(&state.db, &team_id, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found in team".to_string()))?;

    let claims = Claims::new(
        &user.id,
        TokenKind::MagicLink,
        Some(team_id.clone()),
        state.settings.auth.magic_link_ttl(),
        time::now(),
    );
    let token = issue_token(&claims, &state.token_secret);

    let base = format!("{}/submit", state.settings.base_url.trim_end_matches('/'));
    let link = reqwest::Url::parse_with_params(
        &base,
        &[
            ("token", token.as_str()),
            ("team_id", team_id.as_str()),
            ("user_id", user.id.as_str()),
            ("name", user.name.as_str()),
        ],
    )
    .map_err(|e| ApiError::Internal(format!("Invalid base_url '{}': {}", base, e)))?;

    info!(team_id = %team_id, user_id = %user.id, "Created magic link");
    Ok(Json(MagicLinkResponse {
        magic_link: link.to_string(),
    }))
}

/// GET /api/v1/magic-links/:token
///
/// Exchanges a magic-link token for a short-lived access token scoped to
/// the link's team. Every failure is reported as the same 401.
pub async fn exchange_magic_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<SubmissionToken>> {
    let invalid = || ApiError::Unauthorized("Invalid or expired magic link".to_string());
    let now = time::now();

    let claims = verify_token(&token, &state.token_secret, now).map_err(|e| {
        warn!("Rejected magic link: {}", e);
        invalid()
    })?;
    if claims.require_kind(TokenKind::MagicLink).is_err() {
        return Err(invalid());
    }
    let team_id = claims.team_id.ok_or_else(invalid)?;

    let membership = db::teams::find_membership(&state.db, &team_id, &claims.sub).await?;
    match membership {
        Some(m) if m.status != MembershipStatus::Inactive => {}
        _ => return Err(invalid()),
    }

    let access = Claims::new(
        claims.sub,
        TokenKind::Access,
        Some(team_id),
        state.settings.auth.submission_token_ttl(),
        now,
    );

    Ok(Json(SubmissionToken {
        access_token: issue_token(&access, &state.token_secret),
        token_type: "bearer".to_string(),
    }))
}
