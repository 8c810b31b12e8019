use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use crate::{
    AppState,
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::CurrentUser,
    utils::success_to_api_response,
};

use super::model::{
    AddFavoriteRequest, Favorite, FavoriteShare, ShareLinkResponse, ShareQuery, share_url,
    shared_favorites,
};

#[axum::debug_handler]
pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let favorites = Favorite::list_for_user(&state.pool, user.user_id).await?;
    Ok((StatusCode::OK, success_to_api_response(favorites)))
}

#[axum::debug_handler]
pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): ApiJson<AddFavoriteRequest>,
) -> AppResult<impl IntoResponse> {
    let movie_id = req.validate()?;
    let favorite = Favorite::add(&state.pool, user.user_id, movie_id).await?;
    Ok((StatusCode::CREATED, success_to_api_response(favorite)))
}

#[axum::debug_handler]
pub async fn delete_favorite(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> AppResult<StatusCode> {
    Favorite::delete(&state.pool, id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn create_share_link(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let share = FavoriteShare::issue(&state.pool, &state.config, user.user_id).await?;
    Ok((
        StatusCode::OK,
        success_to_api_response(ShareLinkResponse {
            share_url: share_url(&state.config, share.user_id, &share.share_sig),
            user_id: share.user_id,
        }),
    ))
}

/// GET /favorites/{id}?sig=...，公开
#[axum::debug_handler]
pub async fn get_shared_favorites(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): ApiPath<i64>,
    WithRejection(Query(query), _): ApiQuery<ShareQuery>,
) -> AppResult<impl IntoResponse> {
    let favorites =
        shared_favorites(&state.pool, &state.config, user_id, query.sig.as_deref()).await?;
    Ok((StatusCode::OK, success_to_api_response(favorites)))
}
