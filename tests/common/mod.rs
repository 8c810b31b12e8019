#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use moviehub::{AppState, config::Config, router::create_router};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://postgres@localhost/moviehub_test".into(),
        redis_url: None,
        jwt_secret: "integration-jwt-secret".into(),
        jwt_expiration_secs: 3600,
        share_secret: "integration-share-secret".into(),
        share_ttl_secs: None,
        frontend_base_url: "http://localhost:5173".into(),
        api_base_uri: "/api".into(),
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        trust_proxy_headers: false,
        server_host: "127.0.0.1".into(),
        server_port: 0,
        db_max_connections: 1,
    }
}

pub fn app_with_pool(pool: PgPool) -> Router {
    create_router(AppState {
        pool,
        config: test_config(),
        redis: None,
    })
}

/// 不连接数据库的应用，只能走到校验和鉴权为止
pub fn app_without_db() -> Router {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&test_config().database_url)
        .expect("lazy pool");
    app_with_pool(pool)
}

pub fn token_for(user_id: i64) -> String {
    moviehub::utils::generate_token(user_id, &test_config())
        .expect("token")
        .0
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// 注册并登录，返回 (user_id, token)
pub async fn sign_up(app: &Router, email: &str) -> (i64, String) {
    let creds = serde_json::json!({ "email": email, "password": "Secret123" });

    let (status, body) = send(app, Method::POST, "/api/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let (status, body) = send(app, Method::POST, "/api/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    let data = &body["resp_data"];
    (
        data["user_id"].as_i64().unwrap(),
        data["token"].as_str().unwrap().to_string(),
    )
}
