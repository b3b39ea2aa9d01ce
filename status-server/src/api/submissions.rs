//! Weekly update submission

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use status_common::models::{MembershipStatus, PromptStatus, Submission};
use status_common::{is_late, time};
use tracing::{info, warn};

use super::auth::CurrentUser;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    pub content: String,
    pub team_id: String,
}

/// POST /api/v1/submissions
///
/// Lateness and the reporting week come from the team's latest SENT
/// prompt; a team that was never prompted gets one recorded at submission
/// time. The summary check runs in the background.
pub async fn create_submission(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<SubmissionRequest>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Content cannot be empty".to_string()));
    }

    if let Some(scope) = &current.team_id {
        if *scope != req.team_id {
            return Err(ApiError::Forbidden("Token is not valid for this team".to_string()));
        }
    }

    let team = db::teams::get_team(&state.db, &req.team_id).await?;
    let membership = db::teams::find_membership(&state.db, &team.id, &current.user.id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Not a member of this team".to_string()))?;

    match membership.status {
        MembershipStatus::Active => {}
        MembershipStatus::Pending => {
            db::teams::set_membership_status(&state.db, &membership.id, MembershipStatus::Active)
                .await?;
            info!(team_id = %team.id, user_id = %current.user.id, "Activated pending membership");
        }
        MembershipStatus::Inactive => {
            return Err(ApiError::Forbidden("Membership is inactive".to_string()));
        }
    }

    let now = time::now();
    let tz = time::parse_timezone(&team.timezone)?;
    let prompt = match db::prompts::latest_sent(&state.db, &team.id).await? {
        Some(prompt) => prompt,
        None => db::prompts::create_prompt(&state.db, &team.id, now, PromptStatus::Sent).await?,
    };

    let late = is_late(now, prompt.scheduled_for);
    let week = time::week_start_date(prompt.scheduled_for, tz);

    let submission = db::submissions::create_submission(
        &state.db,
        &current.user.id,
        &team.id,
        content,
        now,
        late,
        week,
    )
    .await?;

    info!(
        team_id = %team.id,
        user_id = %current.user.id,
        %week,
        is_late = late,
        "Stored submission"
    );

    let summaries = state.summaries.clone();
    let team_id = team.id.clone();
    tokio::spawn(async move {
        if let Err(e) = summaries.check_and_generate_if_needed(&team_id, week).await {
            warn!(team_id = %team_id, "Summary check failed: {}", e);
        }
    });

    Ok((StatusCode::CREATED, Json(submission)))
}
