//! Manager-only overview of users and teams

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use status_common::models::Team;

use super::auth::CurrentUser;
use crate::db;
use crate::db::teams::TeamMemberDetail;
use crate::db::users::UserWithTeams;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TeamWithMembers {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<TeamMemberDetail>,
}

async fn with_members(state: &AppState, team: Team) -> ApiResult<TeamWithMembers> {
    let members = db::teams::member_details(&state.db, &team.id).await?;
    Ok(TeamWithMembers { team, members })
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<UserWithTeams>>> {
    current.require_manager()?;
    Ok(Json(db::users::list_with_teams(&state.db).await?))
}

/// GET /api/v1/admin/teams
pub async fn list_teams(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<TeamWithMembers>>> {
    current.require_manager()?;

    let teams = db::teams::list_teams(&state.db).await?;
    let mut result = Vec::with_capacity(teams.len());
    for team in teams {
        result.push(with_members(&state, team).await?);
    }
    Ok(Json(result))
}

/// GET /api/v1/admin/teams/:team_id
pub async fn get_team(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(team_id): Path<String>,
) -> ApiResult<Json<TeamWithMembers>> {
    current.require_manager()?;
    let team = db::teams::get_team(&state.db, &team_id).await?;
    Ok(Json(with_members(&state, team).await?))
}
