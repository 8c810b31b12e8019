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
    utils::{message_to_api_response, success_to_api_response},
};

use super::model::{AddCommentRequest, AddMovieRequest, AddOutcome, GroupComment, GroupMovie};

#[axum::debug_handler]
pub async fn list_group_movies(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(group_id), _): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let movies = GroupMovie::list(&state.pool, group_id, user.user_id).await?;
    Ok((StatusCode::OK, success_to_api_response(movies)))
}

/// 新加入返回 201；已经在列表里返回 200 + "already_added"
#[axum::debug_handler]
pub async fn add_movie_to_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(group_id), _): ApiPath<i64>,
    WithRejection(Json(req), _): ApiJson<AddMovieRequest>,
) -> AppResult<impl IntoResponse> {
    let tmdb_movie_id = req.validate()?;

    let response = match GroupMovie::add(&state.pool, group_id, tmdb_movie_id, user.user_id).await? {
        AddOutcome::Added(movie) => (StatusCode::CREATED, success_to_api_response(movie)),
        AddOutcome::AlreadyAdded(movie) => {
            (StatusCode::OK, message_to_api_response("already_added", movie))
        }
    };

    Ok(response)
}

#[axum::debug_handler]
pub async fn remove_movie_from_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path((group_id, group_movie_id)), _): ApiPath<(i64, i64)>,
) -> AppResult<StatusCode> {
    GroupMovie::remove(&state.pool, group_id, group_movie_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path((group_id, group_movie_id)), _): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    let comments = GroupComment::list(&state.pool, group_id, group_movie_id, user.user_id).await?;
    Ok((StatusCode::OK, success_to_api_response(comments)))
}

#[axum::debug_handler]
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path((group_id, group_movie_id)), _): ApiPath<(i64, i64)>,
    WithRejection(Json(req), _): ApiJson<AddCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let content = req.validate()?;
    let comment =
        GroupComment::add(&state.pool, group_id, group_movie_id, user.user_id, content).await?;
    Ok((StatusCode::CREATED, success_to_api_response(comment)))
}
