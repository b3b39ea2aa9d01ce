//! Team creation, membership and schedule

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use status_common::models::Team;
use status_common::time;
use tracing::info;

use super::auth::{require_team_manager, CurrentUser};
use crate::db;
use crate::db::teams::{AddMemberOutcome, NewTeam};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub prompt_day: i64,
    pub prompt_time: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub prompt_day: i64,
    pub prompt_time: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMembersRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MemberResult {
    pub email: String,
    pub status: AddMemberOutcome,
}

#[derive(Debug, Serialize)]
pub struct AddMembersResponse {
    pub team_id: String,
    pub results: Vec<MemberResult>,
}

/// Check prompt schedule fields
fn validate_schedule(prompt_day: i64, prompt_time: &str, timezone: Option<&str>) -> ApiResult<()> {
    time::validate_prompt_day(prompt_day)?;
    time::parse_prompt_time(prompt_time)?;
    if let Some(tz) = timezone {
        time::parse_timezone(tz)?;
    }
    Ok(())
}

/// Trimmed, lowercased email, or a validation error
pub fn normalize_email(raw: &str) -> ApiResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(ApiError::BadRequest(format!("Invalid email address: {}", raw)))
    }
}

/// POST /api/v1/team
pub async fn create_team(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    current.require_manager()?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Team name cannot be empty".to_string()));
    }
    let timezone = req.timezone.unwrap_or_else(|| "UTC".to_string());
    validate_schedule(req.prompt_day, &req.prompt_time, Some(&timezone))?;

    let team = db::teams::create_team(
        &state.db,
        NewTeam {
            name: name.to_string(),
            manager_id: current.user.id.clone(),
            prompt_day: req.prompt_day,
            prompt_time: req.prompt_time,
            timezone,
        },
        time::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(team)))
}

/// POST /api/v1/team/:team_id/members
pub async fn add_members(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(team_id): Path<String>,
    Json(req): Json<AddMembersRequest>,
) -> ApiResult<Json<AddMembersResponse>> {
    require_team_manager(&state, &current, &team_id).await?;

    if req.emails.is_empty() {
        return Err(ApiError::BadRequest("At least one email is required".to_string()));
    }
    let mut emails = Vec::with_capacity(req.emails.len());
    for raw in &req.emails {
        let email = normalize_email(raw)?;
        if !emails.contains(&email) {
            emails.push(email);
        }
    }

    let outcomes = db::teams::add_members_by_email(&state.db, &team_id, &emails, time::now()).await?;
    let added = outcomes
        .iter()
        .filter(|(_, o)| *o == AddMemberOutcome::Added)
        .count();
    info!(team_id = %team_id, added, requested = emails.len(), "Added team members");

    Ok(Json(AddMembersResponse {
        team_id,
        results: outcomes
            .into_iter()
            .map(|(email, status)| MemberResult { email, status })
            .collect(),
    }))
}

/// PUT /api/v1/team/:team_id/schedule
pub async fn update_schedule(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(team_id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<Json<Team>> {
    require_team_manager(&state, &current, &team_id).await?;
    validate_schedule(req.prompt_day, &req.prompt_time, req.timezone.as_deref())?;

    let team = db::teams::update_schedule(
        &state.db,
        &team_id,
        req.prompt_day,
        &req.prompt_time,
        req.timezone.as_deref(),
    )
    .await?;

    info!(
        team_id = %team_id,
        prompt_day = team.prompt_day,
        prompt_time = %team.prompt_time,
        timezone = %team.timezone,
        "Updated team schedule"
    );
    Ok(Json(team))
}

/// GET /api/v1/team/timezones
pub async fn list_timezones() -> Json<Vec<&'static str>> {
    Json(time::all_timezones())
}
