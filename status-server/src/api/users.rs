//! User lookup

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use status_common::models::User;

use super::auth::CurrentUser;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/v1/users/:user_id
///
/// Visible to the user themself and to anyone sharing an active team.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<User>> {
    if user_id == current.user.id {
        return Ok(Json(current.user));
    }

    let user = db::users::find_by_id(&state.db, &user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !db::users::share_active_team(&state.db, &current.user.id, &user.id).await? {
        return Err(ApiError::Forbidden("Not authorized to view this user".to_string()));
    }

    Ok(Json(user))
}
