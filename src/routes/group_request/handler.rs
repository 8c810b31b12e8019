use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use crate::{
    AppState, error::AppResult, extract::ApiPath, middleware::CurrentUser,
    utils::success_to_api_response,
};

use super::model::{Decision, DecisionResponse, JoinRequest};

#[axum::debug_handler]
pub async fn request_to_join(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(group_id), _): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let request = JoinRequest::submit(&state.pool, group_id, user.user_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(request)))
}

#[axum::debug_handler]
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(group_id), _): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let requests = JoinRequest::pending(&state.pool, group_id, user.user_id).await?;
    Ok((StatusCode::OK, success_to_api_response(requests)))
}

async fn decide(
    state: AppState,
    user: CurrentUser,
    group_id: i64,
    request_id: i64,
    decision: Decision,
) -> AppResult<impl IntoResponse> {
    let request =
        JoinRequest::decide(&state.pool, group_id, request_id, user.user_id, decision).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(DecisionResponse {
            msg: decision.label(),
            request,
        }),
    ))
}

#[axum::debug_handler]
pub async fn approve(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path((group_id, request_id)), _): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    decide(state, user, group_id, request_id, Decision::Approve).await
}

#[axum::debug_handler]
pub async fn reject(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path((group_id, request_id)), _): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    decide(state, user, group_id, request_id, Decision::Reject).await
}
