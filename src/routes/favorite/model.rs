use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::utils::{sign_share, signatures_match};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub movie_id: Option<i64>,
}

impl AddFavoriteRequest {
    pub fn validate(&self) -> AppResult<i64> {
        match self.movie_id {
            Some(id) if id > 0 => Ok(id),
            Some(_) => Err(AppError::validation("movie_id", "movie_id must be a positive integer")),
            None => Err(AppError::validation("movie_id", "movie_id is required")),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct FavoriteShare {
    pub user_id: i64,
    pub share_sig: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ShareLinkResponse {
    pub share_url: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    pub sig: Option<String>,
}

impl Favorite {
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Favorite>(
            r#"
            SELECT id, user_id, movie_id, created_at
            FROM favorites
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn add(pool: &PgPool, user_id: i64, movie_id: i64) -> AppResult<Self> {
        sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, movie_id, created_at)
            VALUES ($1, $2, NOW())
            RETURNING id, user_id, movie_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Movie is already in favorites"))
    }

    /// 只能删除自己的收藏
    pub async fn delete(pool: &PgPool, id: i64, user_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM favorites WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Favorite not found"));
        }
        Ok(())
    }
}

pub fn share_url(config: &Config, user_id: i64, sig: &str) -> String {
    format!("{}/favorites/{}?sig={}", config.frontend_base_url, user_id, sig)
}

impl FavoriteShare {
    /// 签发新签名并覆盖旧的，旧链接随即失效
    pub async fn issue(pool: &PgPool, config: &Config, user_id: i64) -> Result<Self, sqlx::Error> {
        let sig = sign_share(&config.share_secret, user_id);

        let share = sqlx::query_as::<_, FavoriteShare>(
            r#"
            INSERT INTO favorite_shares (user_id, share_sig, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET share_sig = EXCLUDED.share_sig, created_at = EXCLUDED.created_at
            RETURNING user_id, share_sig, created_at
            "#,
        )
        .bind(user_id)
        .bind(&sig)
        .fetch_one(pool)
        .await?;

        tracing::info!("Issued favorites share link for user {}", user_id);
        Ok(share)
    }

    pub async fn find_by_user(pool: &PgPool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FavoriteShare>(
            "SELECT user_id, share_sig, created_at FROM favorite_shares WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// 签名必须与当前有效签名完全一致；配置了有效期时还要检查是否过期
    pub fn authorize(&self, provided: &str, ttl: Option<std::time::Duration>, now: DateTime<Utc>) -> AppResult<()> {
        if !signatures_match(&self.share_sig, provided) {
            return Err(AppError::forbidden("Invalid signature"));
        }

        if let Some(ttl) = ttl {
            let age = now.signed_duration_since(self.created_at);
            if age.num_seconds() > ttl.as_secs() as i64 {
                return Err(AppError::forbidden("Share link expired"));
            }
        }

        Ok(())
    }
}

/// 通过分享链接读取收藏，无需登录：签名就是凭证
pub async fn shared_favorites(
    pool: &PgPool,
    config: &Config,
    user_id: i64,
    sig: Option<&str>,
) -> AppResult<Vec<Favorite>> {
    let sig = sig.unwrap_or_default();
    if user_id <= 0 || sig.is_empty() {
        return Err(AppError::validation("sig", "Missing userId or sig"));
    }

    let share = FavoriteShare::find_by_user(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Share not found"))?;

    share.authorize(sig, config.share_ttl(), Utc::now())?;

    Ok(Favorite::list_for_user(pool, user_id).await?)
}
