use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;

use crate::{
    AppState,
    cache::TokenCacheOperations,
    error::{AppError, AppResult},
    extract::ApiJson,
    middleware::{BearerToken, CurrentUser},
    utils::{Claims, generate_token, success_to_api_response},
};

use super::model::{CredentialsRequest, LoginResponse, UpdateProfileRequest, User};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<CredentialsRequest>,
) -> AppResult<impl IntoResponse> {
    let credentials = req.credentials()?;
    let profile = User::create(&state.pool, credentials).await?;
    Ok((StatusCode::CREATED, success_to_api_response(profile)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<CredentialsRequest>,
) -> AppResult<impl IntoResponse> {
    let credentials = req.credentials()?;
    let user = User::authenticate(&state.pool, credentials).await?;

    let (token, expires_at) = generate_token(user.user_id, &state.config)?;
    tracing::debug!("User {} logged in", user.user_id);

    Ok((
        StatusCode::OK,
        success_to_api_response(LoginResponse {
            user_id: user.user_id,
            token,
            expires_at,
        }),
    ))
}

/// 令牌是无状态的；配置了 Redis 时把它加入吊销表直到过期
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> AppResult<impl IntoResponse> {
    if let Some(redis) = &state.redis {
        TokenCacheOperations::revoke_token(redis, &token, claims.exp)
            .await
            .map_err(|e| AppError::Internal(format!("failed to revoke token: {}", e)))?;
    }

    Ok((
        StatusCode::OK,
        success_to_api_response(json!({ "logged_out": true })),
    ))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let profile = User::profile(&state.pool, user.user_id).await?;
    Ok((StatusCode::OK, success_to_api_response(profile)))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): ApiJson<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    let display_name = req.validate()?;
    let profile = User::update_display_name(&state.pool, user.user_id, display_name).await?;
    Ok((StatusCode::OK, success_to_api_response(profile)))
}

#[axum::debug_handler]
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<StatusCode> {
    if !User::delete(&state.pool, user.user_id).await? {
        return Err(AppError::not_found("User not found"));
    }
    tracing::info!("User {} deleted their account", user.user_id);
    Ok(StatusCode::NO_CONTENT)
}
