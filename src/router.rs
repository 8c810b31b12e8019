use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes,
};

// 公开路由：浏览群组列表、注册登录、通过签名读取分享的收藏
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(routes::health::ping))
        .route("/auth/register", post(routes::user::register))
        .route("/auth/login", post(routes::user::login))
        .route("/groups", get(routes::group::list_groups))
        .route("/favorites/{id}", get(routes::favorite::get_shared_favorites))
}

// 需要 bearer 令牌的路由
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(routes::user::logout))
        .route(
            "/profile",
            get(routes::user::get_profile)
                .patch(routes::user::update_profile)
                .delete(routes::user::delete_account),
        )
        // 群组与成员
        .route("/groups", post(routes::group::create_group))
        .route(
            "/groups/{id}",
            get(routes::group::get_group).delete(routes::group::delete_group),
        )
        .route("/groups/{id}/leave", delete(routes::group::leave_group))
        .route("/groups/{id}/members", get(routes::group::list_members))
        .route(
            "/groups/{id}/members/{user_id}",
            delete(routes::group::kick_member),
        )
        // 入群申请
        .route(
            "/groups/{id}/requests",
            post(routes::group_request::request_to_join).get(routes::group_request::list_pending),
        )
        .route(
            "/groups/{id}/requests/{request_id}/approve",
            post(routes::group_request::approve),
        )
        .route(
            "/groups/{id}/requests/{request_id}/reject",
            post(routes::group_request::reject),
        )
        // 群电影与评论
        .route(
            "/groups/{id}/movies",
            get(routes::group_movie::list_group_movies).post(routes::group_movie::add_movie_to_group),
        )
        .route(
            "/groups/{id}/movies/{group_movie_id}",
            delete(routes::group_movie::remove_movie_from_group),
        )
        .route(
            "/groups/{id}/movies/{group_movie_id}/comments",
            get(routes::group_movie::list_comments).post(routes::group_movie::add_comment),
        )
        // 收藏
        .route(
            "/favorites",
            get(routes::favorite::list_favorites).post(routes::favorite::add_favorite),
        )
        .route("/favorites/share", post(routes::favorite::create_share_link))
        .route("/favorites/{id}", delete(routes::favorite::delete_favorite))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// 组装完整的应用路由
pub fn create_router(state: AppState) -> Router {
    let api = public_routes().merge(protected_routes(&state));

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    let router = router
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http());

    // 只有配置了 Redis 才启用限流
    let router = match &state.redis {
        Some(redis) => {
            let limiter = Arc::new(RateLimiter::new(redis.clone(), state.config.clone()));
            router.layer(from_fn_with_state(limiter, rate_limit))
        }
        None => router,
    };

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
