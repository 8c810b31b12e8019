use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use crate::utils::{hash_password, verify_password};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Profile {
    pub user_id: i64,
    pub email: String,
    pub display_name: Option<String>,
}

/// 旧前端用 username 字段传邮箱，两者都接受
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
}

impl CredentialsRequest {
    /// 邮箱去空白并转小写；密码原样保留
    pub fn credentials(self) -> AppResult<Credentials> {
        let email = self
            .email
            .or(self.username)
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        match (email, self.password.filter(|p| !p.is_empty())) {
            (Some(email), Some(password)) => Ok(Credentials { email, password }),
            (None, _) => Err(AppError::validation("email", "Email and password are required.")),
            (_, None) => Err(AppError::validation("password", "Email and password are required.")),
        }
    }
}

/// 注册密码规则：至少 8 位，包含大写字母和数字
pub fn check_password_rules(password: &str) -> AppResult<()> {
    if password.chars().count() < 8 {
        return Err(AppError::validation(
            "password",
            "The password must be at least 8 characters long.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::validation(
            "password",
            "The password must contain at least one uppercase letter.",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::validation(
            "password",
            "The password must contain at least one number.",
        ));
    }
    Ok(())
}

impl UpdateProfileRequest {
    pub fn validate(self) -> AppResult<String> {
        let value = self.display_name.unwrap_or_default().trim().to_string();
        if value.is_empty() {
            return Err(AppError::validation("display_name", "display_name is required"));
        }
        let len = value.chars().count();
        if !(2..=50).contains(&len) {
            return Err(AppError::validation(
                "display_name",
                "display_name must be 2-50 characters",
            ));
        }
        Ok(value)
    }
}

impl User {
    pub async fn create(pool: &PgPool, credentials: Credentials) -> AppResult<Profile> {
        check_password_rules(&credentials.password)?;

        let password = credentials.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))??;

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO users (email, password_hash, created_at)
            VALUES ($1, $2, NOW())
            RETURNING user_id, email, display_name
            "#,
        )
        .bind(&credentials.email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Email is already in use."))?;

        tracing::info!("Registered user {}", profile.user_id);
        Ok(profile)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, display_name, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// 邮箱不存在和密码错误返回同样的 401
    pub async fn authenticate(pool: &PgPool, credentials: Credentials) -> AppResult<Self> {
        let user = Self::find_by_email(pool, &credentials.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let hash = user.password_hash.clone();
        let password = credentials.password;
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))??;

        if !ok {
            return Err(AppError::Unauthorized);
        }
        Ok(user)
    }

    pub async fn profile(pool: &PgPool, user_id: i64) -> AppResult<Profile> {
        sqlx::query_as::<_, Profile>(
            "SELECT user_id, email, display_name FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn update_display_name(
        pool: &PgPool,
        user_id: i64,
        display_name: String,
    ) -> AppResult<Profile> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE users
            SET display_name = $1
            WHERE user_id = $2
            RETURNING user_id, email, display_name
            "#,
        )
        .bind(display_name)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Display name is already taken"))?
        .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// 收藏、评分、分享、申请、成员关系和自己创建的群组都会级联删除
    pub async fn delete(pool: &PgPool, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
