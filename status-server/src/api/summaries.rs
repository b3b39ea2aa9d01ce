//! Weekly summary endpoints

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use status_common::models::{SummaryTrigger, WeeklySummary};
use status_common::time;

use super::auth::{require_team_access, require_team_manager, CurrentUser};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub week_start_date: Option<String>,
}

fn parse_week(value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!("Invalid week_start_date '{}', expected YYYY-MM-DD", value))
    })
}

/// POST /api/v1/summaries/:team_id/generate
///
/// Without `week_start_date`, generates for the week of the latest sent
/// prompt, which is the week new submissions are filed under.
pub async fn generate_summary(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(team_id): Path<String>,
    Query(query): Query<GenerateQuery>,
) -> ApiResult<Json<WeeklySummary>> {
    let team = require_team_manager(&state, &current, &team_id).await?;

    let week = match query.week_start_date.as_deref() {
        Some(value) => parse_week(value)?,
        None => {
            let tz = time::parse_timezone(&team.timezone)?;
            let anchor = db::prompts::latest_sent(&state.db, &team.id)
                .await?
                .map_or_else(time::now, |prompt| prompt.scheduled_for);
            time::week_start_date(anchor, tz)
        }
    };

    let summary = state
        .summaries
        .generate_summary(&team.id, week, SummaryTrigger::Manual)
        .await?;
    Ok(Json(summary))
}

/// GET /api/v1/summaries/:team_id
pub async fn list_summaries(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(team_id): Path<String>,
) -> ApiResult<Json<Vec<WeeklySummary>>> {
    require_team_access(&state, &current, &team_id).await?;
    Ok(Json(db::summaries::list_for_team(&state.db, &team_id).await?))
}

/// GET /api/v1/summaries/:team_id/:week_start_date
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((team_id, week_start_date)): Path<(String, String)>,
) -> ApiResult<Json<WeeklySummary>> {
    require_team_access(&state, &current, &team_id).await?;
    let week = parse_week(&week_start_date)?;

    db::summaries::find_summary(&state.db, &team_id, week)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No summary for week starting {}", week)))
}
