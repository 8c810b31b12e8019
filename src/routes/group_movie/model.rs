use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use crate::routes::group::Group;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupMovie {
    pub group_movie_id: i64,
    pub group_id: i64,
    pub tmdb_movie_id: i64,
    pub added_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct GroupMovieListItem {
    pub group_movie_id: i64,
    pub group_id: i64,
    pub tmdb_movie_id: i64,
    pub added_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub added_by_name: Option<String>,
    pub added_by_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GroupComment {
    pub comment_id: i64,
    pub group_movie_id: i64,
    pub user_id: Option<i64>,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AddMovieRequest {
    pub tmdb_movie_id: Option<i64>,
}

impl AddMovieRequest {
    pub fn validate(&self) -> AppResult<i64> {
        match self.tmdb_movie_id {
            Some(id) if id > 0 => Ok(id),
            Some(_) => Err(AppError::validation(
                "tmdb_movie_id",
                "tmdb_movie_id must be a positive integer",
            )),
            None => Err(AppError::validation("tmdb_movie_id", "tmdb_movie_id is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: Option<String>,
}

pub const MAX_COMMENT_LEN: usize = 2000;

impl AddCommentRequest {
    pub fn validate(&self) -> AppResult<String> {
        let content = self.content.as_deref().unwrap_or_default().trim();
        if content.is_empty() {
            return Err(AppError::validation("content", "content is required"));
        }
        if content.chars().count() > MAX_COMMENT_LEN {
            return Err(AppError::validation(
                "content",
                format!("content must be at most {} characters", MAX_COMMENT_LEN),
            ));
        }
        Ok(content.to_string())
    }
}

/// 添加电影的结果：新加入，或者之前就已经在列表里
#[derive(Debug)]
pub enum AddOutcome {
    Added(GroupMovie),
    AlreadyAdded(GroupMovie),
}

const MOVIE_COLUMNS: &str = "group_movie_id, group_id, tmdb_movie_id, added_by, created_at";

impl GroupMovie {
    pub async fn list(pool: &PgPool, group_id: i64, user_id: i64) -> AppResult<Vec<GroupMovieListItem>> {
        Group::require_member(pool, group_id, user_id).await?;

        let movies = sqlx::query_as::<_, GroupMovieListItem>(
            r#"
            SELECT
                gm.group_movie_id, gm.group_id, gm.tmdb_movie_id, gm.added_by, gm.created_at,
                COALESCE(u.display_name, u.email) AS added_by_name,
                u.email AS added_by_email
            FROM group_movies gm
            LEFT JOIN users u ON u.user_id = gm.added_by
            WHERE gm.group_id = $1
            ORDER BY gm.created_at DESC, gm.group_movie_id DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(movies)
    }

    /// 任何成员都能添加；同一部电影重复添加不会产生第二行
    pub async fn add(pool: &PgPool, group_id: i64, tmdb_movie_id: i64, user_id: i64) -> AppResult<AddOutcome> {
        Group::require_member(pool, group_id, user_id).await?;

        let inserted = sqlx::query_as::<_, GroupMovie>(&format!(
            r#"
            INSERT INTO group_movies (group_id, tmdb_movie_id, added_by, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (group_id, tmdb_movie_id) DO NOTHING
            RETURNING {}
            "#,
            MOVIE_COLUMNS
        ))
        .bind(group_id)
        .bind(tmdb_movie_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        if let Some(movie) = inserted {
            tracing::info!("User {} added movie {} to group {}", user_id, tmdb_movie_id, group_id);
            return Ok(AddOutcome::Added(movie));
        }

        let existing = sqlx::query_as::<_, GroupMovie>(&format!(
            "SELECT {} FROM group_movies WHERE group_id = $1 AND tmdb_movie_id = $2",
            MOVIE_COLUMNS
        ))
        .bind(group_id)
        .bind(tmdb_movie_id)
        .fetch_one(pool)
        .await?;

        Ok(AddOutcome::AlreadyAdded(existing))
    }

    /// 只有群主能移除，添加者本人也不行
    pub async fn remove(pool: &PgPool, group_id: i64, group_movie_id: i64, owner_id: i64) -> AppResult<()> {
        Group::require_owner(pool, group_id, owner_id, "Only owner can remove group movies").await?;

        let result = sqlx::query("DELETE FROM group_movies WHERE group_id = $1 AND group_movie_id = $2")
            .bind(group_id)
            .bind(group_movie_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Group movie not found"));
        }
        Ok(())
    }

    /// 群电影必须属于这个群组，否则 404
    async fn ensure_in_group(pool: &PgPool, group_id: i64, group_movie_id: i64) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM group_movies WHERE group_id = $1 AND group_movie_id = $2)",
        )
        .bind(group_id)
        .bind(group_movie_id)
        .fetch_one(pool)
        .await?;

        if !exists {
            return Err(AppError::not_found("Group movie not found"));
        }
        Ok(())
    }
}

impl GroupComment {
    pub async fn list(
        pool: &PgPool,
        group_id: i64,
        group_movie_id: i64,
        user_id: i64,
    ) -> AppResult<Vec<Self>> {
        Group::require_member(pool, group_id, user_id).await?;
        GroupMovie::ensure_in_group(pool, group_id, group_movie_id).await?;

        let comments = sqlx::query_as::<_, GroupComment>(
            r#"
            SELECT comment_id, group_movie_id, user_id, author_name, content, created_at
            FROM group_movie_comments
            WHERE group_movie_id = $1
            ORDER BY created_at ASC, comment_id ASC
            "#,
        )
        .bind(group_movie_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// 作者名在写入时就固化下来（显示名，没有则用邮箱），读取时不再关联用户表
    pub async fn add(
        pool: &PgPool,
        group_id: i64,
        group_movie_id: i64,
        user_id: i64,
        content: String,
    ) -> AppResult<Self> {
        Group::require_member(pool, group_id, user_id).await?;
        GroupMovie::ensure_in_group(pool, group_id, group_movie_id).await?;

        let comment = sqlx::query_as::<_, GroupComment>(
            r#"
            INSERT INTO group_movie_comments (group_movie_id, user_id, author_name, content, created_at)
            SELECT $1, u.user_id, COALESCE(u.display_name, u.email), $3, NOW()
            FROM users u
            WHERE u.user_id = $2
            RETURNING comment_id, group_movie_id, user_id, author_name, content, created_at
            "#,
        )
        .bind(group_movie_id)
        .bind(user_id)
        .bind(content)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Unauthorized)?;

        Ok(comment)
    }
}
