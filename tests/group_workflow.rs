//! 基于真实 Postgres 的场景测试。
//! 需要 DATABASE_URL 指向一个可以建库的实例：`cargo test -- --ignored`

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;

use common::{app_with_pool, send, sign_up};

async fn create_group(app: &axum::Router, token: &str, name: &str) -> i64 {
    let (status, body) = send(app, Method::POST, "/api/groups", Some(token), Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["resp_data"]["group_id"].as_i64().unwrap()
}

async fn owner_rows(pool: &PgPool, group_id: i64) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM group_members WHERE group_id = $1 AND role = 'owner'",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

fn data(body: &Value) -> &Value {
    &body["resp_data"]
}

/// 申请入群，返回 request_id
async fn request_join(app: &axum::Router, token: &str, group_id: i64) -> i64 {
    let (status, body) = send(app, Method::POST, &format!("/api/groups/{}/requests", group_id), Some(token), None).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    data(&body)["request_id"].as_i64().unwrap()
}

async fn decide(app: &axum::Router, token: &str, group_id: i64, request_id: i64, action: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/api/groups/{}/requests/{}/{}", group_id, request_id, action),
        Some(token),
        None,
    )
    .await
}

async fn detail_status(app: &axum::Router, token: &str, group_id: i64) -> StatusCode {
    send(app, Method::GET, &format!("/api/groups/{}", group_id), Some(token), None).await.0
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn approval_flow_grants_membership(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (owner_id, owner) = sign_up(&app, "owner@example.com").await;
    let (member_id, member) = sign_up(&app, "member@example.com").await;

    let group_id = create_group(&app, &owner, "Horror Fans").await;
    assert_eq!(owner_rows(&pool, group_id).await, vec![owner_id]);

    // 非成员看不到详情
    let (status, _) = send(&app, Method::GET, &format!("/api/groups/{}", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, &format!("/api/groups/{}/requests", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&body)["status"], "pending");
    let request_id = data(&body)["request_id"].as_i64().unwrap();

    // 只有群主能看待审核列表
    let (status, _) = send(&app, Method::GET, &format!("/api/groups/{}/requests", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, &format!("/api/groups/{}/requests", group_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let pending = data(&body).as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["user_id"], member_id);

    let approve = format!("/api/groups/{}/requests/{}/approve", group_id, request_id);
    let (status, _) = send(&app, Method::POST, &approve, Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, &approve, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["request"]["status"], "approved");
    assert_eq!(data(&body)["request"]["decided_by"], owner_id);

    // 重复批准是安全的
    let (status, _) = send(&app, Method::POST, &approve, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &format!("/api/groups/{}/members", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    let members = data(&body).as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["user_id"], owner_id);
    assert_eq!(members[0]["role"], "owner");
    assert_eq!(members[1]["user_id"], member_id);
    assert_eq!(members[1]["role"], "member");

    let (status, _) = send(&app, Method::GET, &format!("/api/groups/{}/movies", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &format!("/api/groups/{}", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["isOwner"], false);

    // 公开列表不需要令牌
    let (status, body) = send(&app, Method::GET, "/api/groups", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = &data(&body)[0];
    assert_eq!(listed["group_id"], group_id);
    assert_eq!(listed["member_count"], 2);
    assert_eq!(listed["owner_email"], "owner@example.com");

    assert_eq!(owner_rows(&pool, group_id).await, vec![owner_id]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn rejected_user_can_request_again(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, member) = sign_up(&app, "member@example.com").await;
    let group_id = create_group(&app, &owner, "Noir").await;

    let requests = format!("/api/groups/{}/requests", group_id);
    let (_, body) = send(&app, Method::POST, &requests, Some(&member), None).await;
    let request_id = data(&body)["request_id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/{}/reject", requests, request_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["request"]["status"], "rejected");

    // 拒绝不会带来成员身份
    let (status, _) = send(&app, Method::GET, &format!("/api/groups/{}", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, &requests, Some(&member), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&body)["request_id"], request_id);
    assert_eq!(data(&body)["status"], "pending");
    assert!(data(&body)["decided_by"].is_null());
    assert!(data(&body)["decided_at"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn owner_cannot_leave_or_be_kicked(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (owner_id, owner) = sign_up(&app, "owner@example.com").await;
    let (member_id, member) = sign_up(&app, "member@example.com").await;
    let group_id = create_group(&app, &owner, "Westerns").await;

    let (status, _) = send(&app, Method::DELETE, &format!("/api/groups/{}/leave", group_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/groups/{}/members/{}", group_id, owner_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 非成员退出 404；已是成员再申请 409
    let (status, _) = send(&app, Method::DELETE, &format!("/api/groups/{}/leave", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, &format!("/api/groups/{}/requests", group_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, Method::POST, &format!("/api/groups/{}/requests", group_id), Some(&member), None).await;
    let request_id = data(&body)["request_id"].as_i64().unwrap();
    send(
        &app,
        Method::POST,
        &format!("/api/groups/{}/requests/{}/approve", group_id, request_id),
        Some(&owner),
        None,
    )
    .await;

    let kick = format!("/api/groups/{}/members/{}", group_id, member_id);
    let (status, _) = send(&app, Method::DELETE, &kick, Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &kick, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &kick, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(owner_rows(&pool, group_id).await, vec![owner_id]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn group_movies_are_idempotent_and_owner_curated(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, outsider) = sign_up(&app, "outsider@example.com").await;
    let group_id = create_group(&app, &owner, "Sci-Fi").await;
    let movies = format!("/api/groups/{}/movies", group_id);

    let (status, _) = send(&app, Method::POST, &movies, Some(&outsider), Some(json!({ "tmdb_movie_id": 603 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, &movies, Some(&owner), Some(json!({ "tmdb_movie_id": 603 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let group_movie_id = data(&body)["group_movie_id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::POST, &movies, Some(&owner), Some(json!({ "tmdb_movie_id": 603 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "already_added");
    assert_eq!(data(&body)["group_movie_id"], group_movie_id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM group_movies WHERE group_id = $1")
        .bind(group_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let comments = format!("{}/{}/comments", movies, group_movie_id);
    let (status, body) = send(&app, Method::POST, &comments, Some(&owner), Some(json!({ "content": "  classic " }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&body)["content"], "classic");
    assert_eq!(data(&body)["author_name"], "owner@example.com");

    let (status, body) = send(&app, Method::GET, &comments, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body).as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, &comments, Some(&outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &format!("{}/{}", movies, group_movie_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &format!("{}/{}", movies, group_movie_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn deleting_group_cascades(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, other) = sign_up(&app, "other@example.com").await;
    let group_id = create_group(&app, &owner, "Anime").await;
    send(&app, Method::POST, &format!("/api/groups/{}/requests", group_id), Some(&other), None).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/api/groups/{}", group_id), Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/groups/{}", group_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/groups/{}", group_id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let leftovers: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM group_members WHERE group_id = $1) + \
                (SELECT COUNT(*) FROM group_join_requests WHERE group_id = $1)",
    )
    .bind(group_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(leftovers, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn share_link_rotates_on_reissue(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (user_id, token) = sign_up(&app, "fan@example.com").await;

    let (status, _) = send(&app, Method::POST, "/api/favorites", Some(&token), Some(json!({ "movie_id": 550 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, Method::POST, "/api/favorites", Some(&token), Some(json!({ "movie_id": 550 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::GET, &format!("/api/favorites/{}?sig=abc", user_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let sig_of = |body: &Value| {
        let url = data(body)["share_url"].as_str().unwrap().to_string();
        url.split("sig=").nth(1).unwrap().to_string()
    };

    let (status, body) = send(&app, Method::POST, "/api/favorites/share", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["user_id"], user_id);
    let first = sig_of(&body);

    let shared = |sig: &str| format!("/api/favorites/{}?sig={}", user_id, sig);

    let (status, body) = send(&app, Method::GET, &shared(&first), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)[0]["movie_id"], 550);

    let (status, _) = send(&app, Method::GET, &shared("deadbeef"), None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 签名必须逐字节一致，前后带空白也不行
    let (status, _) = send(&app, Method::GET, &shared(&format!("%20{}%20", first)), None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&app, Method::POST, "/api/favorites/share", Some(&token), None).await;
    let second = sig_of(&body);
    assert_ne!(first, second);

    let (status, _) = send(&app, Method::GET, &shared(&first), None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, &shared(&second), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn account_lifecycle(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, token) = sign_up(&app, "Neo@Example.com").await;
    let (_, other) = sign_up(&app, "trinity@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "neo@example.com", "password": "Secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "neo@example.com", "password": "Wrong1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::PATCH, "/api/profile", Some(&token), Some(json!({ "display_name": "Neo" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["display_name"], "Neo");
    assert_eq!(data(&body)["email"], "neo@example.com");

    let (status, _) = send(&app, Method::PATCH, "/api/profile", Some(&other), Some(json!({ "display_name": "Neo" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn decided_requests_are_final(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, approved) = sign_up(&app, "approved@example.com").await;
    let (_, rejected) = sign_up(&app, "rejected@example.com").await;
    let group_id = create_group(&app, &owner, "Giallo").await;

    let first = request_join(&app, &approved, group_id).await;
    let (status, body) = decide(&app, &owner, group_id, first, "approve").await;
    assert_eq!(status, StatusCode::OK);
    let decided_at = data(&body)["request"]["decided_at"].clone();

    // 已批准的申请不能再被拒绝，成员身份保持不变
    let (status, _) = decide(&app, &owner, group_id, first, "reject").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(detail_status(&app, &approved, group_id).await, StatusCode::OK);

    // 再次批准原样返回
    let (status, body) = decide(&app, &owner, group_id, first, "approve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["request"]["status"], "approved");
    assert_eq!(data(&body)["request"]["decided_at"], decided_at);

    let second = request_join(&app, &rejected, group_id).await;
    let (status, _) = decide(&app, &owner, group_id, second, "reject").await;
    assert_eq!(status, StatusCode::OK);
    for action in ["approve", "reject"] {
        let (status, _) = decide(&app, &owner, group_id, second, action).await;
        assert_eq!(status, StatusCode::CONFLICT, "{}", action);
    }
    assert_eq!(detail_status(&app, &rejected, group_id).await, StatusCode::FORBIDDEN);

    let status: String = sqlx::query_scalar(
        "SELECT status::text FROM group_join_requests WHERE request_id = $1",
    )
    .bind(first)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "approved");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn request_of_another_group_is_not_found(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, user) = sign_up(&app, "user@example.com").await;
    let group_a = create_group(&app, &owner, "Group A").await;
    let group_b = create_group(&app, &owner, "Group B").await;

    let request_id = request_join(&app, &user, group_b).await;

    for action in ["approve", "reject"] {
        let (status, _) = decide(&app, &owner, group_a, request_id, action).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", action);
    }
    assert_eq!(detail_status(&app, &user, group_a).await, StatusCode::FORBIDDEN);
    assert_eq!(detail_status(&app, &user, group_b).await, StatusCode::FORBIDDEN);

    // 仍然在 B 的待审核列表里
    let (_, body) = send(&app, Method::GET, &format!("/api/groups/{}/requests", group_b), Some(&owner), None).await;
    assert_eq!(data(&body).as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn member_leaves_and_loses_access(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (_, owner) = sign_up(&app, "owner@example.com").await;
    let (_, member) = sign_up(&app, "member@example.com").await;
    let group_id = create_group(&app, &owner, "Musicals").await;

    let request_id = request_join(&app, &member, group_id).await;
    decide(&app, &owner, group_id, request_id, "approve").await;
    assert_eq!(detail_status(&app, &member, group_id).await, StatusCode::OK);

    let leave = format!("/api/groups/{}/leave", group_id);
    let (status, _) = send(&app, Method::DELETE, &leave, Some(&member), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(detail_status(&app, &member, group_id).await, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &leave, Some(&member), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn kick_keeps_request_history_and_allows_rerequest(pool: PgPool) {
    let app = app_with_pool(pool.clone());
    let (owner_id, owner) = sign_up(&app, "owner@example.com").await;
    let (member_id, member) = sign_up(&app, "member@example.com").await;
    let group_id = create_group(&app, &owner, "Documentaries").await;

    let request_id = request_join(&app, &member, group_id).await;
    decide(&app, &owner, group_id, request_id, "approve").await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/groups/{}/members/{}", group_id, member_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(detail_status(&app, &member, group_id).await, StatusCode::FORBIDDEN);

    let (status, decided_by): (String, Option<i64>) = sqlx::query_as(
        "SELECT status::text, decided_by FROM group_join_requests WHERE request_id = $1",
    )
    .bind(request_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "approved");
    assert_eq!(decided_by, Some(owner_id));

    let (status, body) = send(&app, Method::POST, &format!("/api/groups/{}/requests", group_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(data(&body)["request_id"], request_id);
    assert_eq!(data(&body)["status"], "pending");
    assert!(data(&body)["decided_by"].is_null());

    // 重新申请后可以再次被批准
    let (status, _) = decide(&app, &owner, group_id, request_id, "approve").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail_status(&app, &member, group_id).await, StatusCode::OK);
}
