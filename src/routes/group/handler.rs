use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use crate::{
    AppState,
    error::AppResult,
    extract::{ApiJson, ApiPath},
    middleware::CurrentUser,
    utils::success_to_api_response,
};

use super::model::{CreateGroupRequest, Group};

/// GET /groups，公开
#[axum::debug_handler]
pub async fn list_groups(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let groups = Group::list_all(&state.pool).await?;
    Ok((StatusCode::OK, success_to_api_response(groups)))
}

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): ApiJson<CreateGroupRequest>,
) -> AppResult<impl IntoResponse> {
    let new_group = req.validate()?;
    let group = Group::create(&state.pool, new_group, user.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(group)))
}

#[axum::debug_handler]
pub async fn get_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(group_id), _): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let detail = Group::detail_for(&state.pool, group_id, user.user_id).await?;
    Ok((StatusCode::OK, success_to_api_response(detail)))
}

#[axum::debug_handler]
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(group_id), _): ApiPath<i64>,
) -> AppResult<StatusCode> {
    Group::delete(&state.pool, group_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_members(
    State(state): State<AppState>,
    WithRejection(Path(group_id), _): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let members = Group::members(&state.pool, group_id).await?;
    Ok((StatusCode::OK, success_to_api_response(members)))
}

#[axum::debug_handler]
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(group_id), _): ApiPath<i64>,
) -> AppResult<StatusCode> {
    Group::leave(&state.pool, group_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn kick_member(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path((group_id, target_id)), _): ApiPath<(i64, i64)>,
) -> AppResult<StatusCode> {
    Group::kick(&state.pool, group_id, target_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
