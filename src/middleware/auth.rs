use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{AppState, cache::TokenCacheOperations, error::AppError, utils::verify_token};

/// 通过认证的调用方，由 auth_middleware 注入到请求扩展中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
}

/// 原始 bearer 令牌，注销时需要用到
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(&token, &state.config).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::Unauthorized
    })?;

    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::Unauthorized)?;

    if let Some(redis) = &state.redis {
        match TokenCacheOperations::is_revoked(redis, &token).await {
            Ok(true) => return Err(AppError::Unauthorized),
            Ok(false) => {}
            Err(e) => tracing::warn!("Token revocation check skipped: {}", e),
        }
    }

    let extensions = request.extensions_mut();
    extensions.insert(CurrentUser { user_id });
    extensions.insert(claims);
    extensions.insert(BearerToken(token));

    Ok(next.run(request).await)
}
