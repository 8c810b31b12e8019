use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub group_id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

/// 公开列表里的群组，附带创建者邮箱和成员数
#[derive(Debug, Serialize, FromRow)]
pub struct GroupSummary {
    pub group_id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub owner_email: Option<String>,
    pub member_count: i64,
}

#[derive(Debug, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    #[serde(rename = "isOwner")]
    pub is_owner: bool,
}

#[derive(Debug, Serialize, FromRow)]
pub struct GroupMember {
    pub user_id: i64,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// 校验后的建群参数
#[derive(Debug, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
}

const MAX_GROUP_NAME_LEN: usize = 100;

impl CreateGroupRequest {
    pub fn validate(self) -> AppResult<NewGroup> {
        let name = self.name.as_deref().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "Group name is required"));
        }
        if name.chars().count() > MAX_GROUP_NAME_LEN {
            return Err(AppError::validation(
                "name",
                format!("Group name must be at most {} characters", MAX_GROUP_NAME_LEN),
            ));
        }

        Ok(NewGroup {
            name: name.to_string(),
            description: self.description.unwrap_or_default().trim().to_string(),
        })
    }
}

/// 把 user_id 以 role 身份写进成员表，已存在则什么也不做。
/// 返回是否真的插入了新行。
pub(crate) async fn insert_membership<'e, E>(
    executor: E,
    group_id: i64,
    user_id: i64,
    role: MemberRole,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO group_members (group_id, user_id, role, joined_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (group_id, user_id) DO NOTHING
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .bind(role)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

impl Group {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }

    /// 群主的成员身份不可变：不能退出，也不能被踢出
    pub fn ensure_not_owner(&self, user_id: i64, message: &str) -> AppResult<()> {
        if self.is_owned_by(user_id) {
            return Err(AppError::validation("user_id", message));
        }
        Ok(())
    }

    pub async fn create(pool: &PgPool, new: NewGroup, owner_id: i64) -> Result<Self, sqlx::Error> {
        // 群组和群主成员行必须同时写入
        let mut tx = pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name, description, owner_id, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING group_id, name, description, owner_id, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_membership(&mut *tx, group.group_id, owner_id, MemberRole::Owner).await?;

        tx.commit().await?;

        tracing::info!("User {} created group {} ({})", owner_id, group.group_id, group.name);
        Ok(group)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<GroupSummary>, sqlx::Error> {
        sqlx::query_as::<_, GroupSummary>(
            r#"
            SELECT
                g.group_id, g.name, g.description, g.owner_id, g.created_at,
                u.email AS owner_email,
                COUNT(m.user_id) AS member_count
            FROM groups g
            LEFT JOIN group_members m ON m.group_id = g.group_id
            LEFT JOIN users u ON u.user_id = g.owner_id
            GROUP BY g.group_id, u.email
            ORDER BY g.created_at DESC, g.group_id DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, group_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            r#"
            SELECT group_id, name, description, owner_id, created_at
            FROM groups
            WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(pool)
        .await
    }

    /// 查不到群组时返回 404
    pub async fn get(pool: &PgPool, group_id: i64) -> AppResult<Self> {
        Self::find_by_id(pool, group_id)
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))
    }

    pub async fn is_member(pool: &PgPool, group_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM group_members
                WHERE group_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn is_owner(pool: &PgPool, group_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM groups
                WHERE group_id = $1 AND owner_id = $2
            )
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn require_member(pool: &PgPool, group_id: i64, user_id: i64) -> AppResult<()> {
        if !Self::is_member(pool, group_id, user_id).await? {
            return Err(AppError::forbidden("Not a group member"));
        }
        Ok(())
    }

    pub async fn require_owner(
        pool: &PgPool,
        group_id: i64,
        user_id: i64,
        message: &str,
    ) -> AppResult<()> {
        if !Self::is_owner(pool, group_id, user_id).await? {
            return Err(AppError::forbidden(message));
        }
        Ok(())
    }

    /// 群组详情只对成员可见
    pub async fn detail_for(pool: &PgPool, group_id: i64, caller_id: i64) -> AppResult<GroupDetail> {
        let group = Self::get(pool, group_id).await?;

        if !Self::is_member(pool, group_id, caller_id).await? {
            return Err(AppError::forbidden("You are not a member of this group"));
        }

        let is_owner = group.is_owned_by(caller_id);
        Ok(GroupDetail { group, is_owner })
    }

    pub async fn delete(pool: &PgPool, group_id: i64, caller_id: i64) -> AppResult<()> {
        let group = Self::get(pool, group_id).await?;
        if !group.is_owned_by(caller_id) {
            return Err(AppError::forbidden("not_owner"));
        }

        // 成员、申请、群电影和评论都由外键级联删除
        sqlx::query("DELETE FROM groups WHERE group_id = $1")
            .bind(group_id)
            .execute(pool)
            .await?;

        tracing::info!("Group {} deleted by owner {}", group_id, caller_id);
        Ok(())
    }

    /// 群主排第一，其余按加入时间升序
    pub async fn members(pool: &PgPool, group_id: i64) -> Result<Vec<GroupMember>, sqlx::Error> {
        sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT m.user_id, m.role, m.joined_at, u.email, u.display_name
            FROM group_members m
            JOIN users u ON u.user_id = m.user_id
            WHERE m.group_id = $1
            ORDER BY (m.role = 'owner') DESC, m.joined_at ASC, m.user_id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await
    }

    /// 只删除普通成员行，群主行永远不会被这里删掉
    async fn remove_member(pool: &PgPool, group_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM group_members
            WHERE group_id = $1 AND user_id = $2 AND role = 'member'
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn leave(pool: &PgPool, group_id: i64, user_id: i64) -> AppResult<()> {
        let group = Self::get(pool, group_id).await?;
        group.ensure_not_owner(user_id, "Owner cannot leave their own group (delete it instead)")?;

        if !Self::remove_member(pool, group_id, user_id).await? {
            return Err(AppError::not_found("Not a member"));
        }

        tracing::info!("User {} left group {}", user_id, group_id);
        Ok(())
    }

    /// 踢人不会动对方的入群申请记录
    pub async fn kick(pool: &PgPool, group_id: i64, target_id: i64, owner_id: i64) -> AppResult<()> {
        Self::require_owner(pool, group_id, owner_id, "Only owner can remove members").await?;

        let group = Self::get(pool, group_id).await?;
        group.ensure_not_owner(target_id, "Owner cannot be removed")?;

        if !Self::remove_member(pool, group_id, target_id).await? {
            return Err(AppError::not_found("User is not a member"));
        }

        tracing::info!("User {} removed from group {} by {}", target_id, group_id, owner_id);
        Ok(())
    }
}
