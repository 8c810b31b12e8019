use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use crate::routes::group::{Group, MemberRole, insert_membership};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "join_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JoinRequest {
    pub request_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<i64>,
}

/// 待审核列表中的一项，带上申请人邮箱方便群主辨认
#[derive(Debug, Serialize, FromRow)]
pub struct PendingRequest {
    pub request_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub msg: &'static str,
    pub request: JoinRequest,
}

/// 群主对申请的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply,
    Unchanged,
}

impl Decision {
    pub fn status(self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Decision::Approve => "Approved",
            Decision::Reject => "Rejected",
        }
    }

    /// pending 可以被处理；approved 再批准是空操作；其余都是冲突
    pub fn transition(self, current: RequestStatus) -> AppResult<Transition> {
        match (current, self) {
            (RequestStatus::Pending, _) => Ok(Transition::Apply),
            (RequestStatus::Approved, Decision::Approve) => Ok(Transition::Unchanged),
            (RequestStatus::Approved, Decision::Reject) => {
                Err(AppError::conflict("Request has already been approved"))
            }
            (RequestStatus::Rejected, _) => {
                Err(AppError::conflict("Request has already been rejected"))
            }
        }
    }

    fn forbidden_message(self) -> &'static str {
        match self {
            Decision::Approve => "Only owner can approve",
            Decision::Reject => "Only owner can reject",
        }
    }
}

const REQUEST_COLUMNS: &str =
    "request_id, group_id, user_id, status, created_at, decided_at, decided_by";

impl JoinRequest {
    /// 提交入群申请。
    /// 已存在的申请（包括被拒绝的）会被重置为 pending 并清空审批信息。
    pub async fn submit(pool: &PgPool, group_id: i64, user_id: i64) -> AppResult<Self> {
        Group::get(pool, group_id).await?;

        if Group::is_member(pool, group_id, user_id).await? {
            return Err(AppError::conflict("Already a member of this group"));
        }

        let request = sqlx::query_as::<_, JoinRequest>(&format!(
            r#"
            INSERT INTO group_join_requests (group_id, user_id, status, created_at)
            VALUES ($1, $2, 'pending', NOW())
            ON CONFLICT (group_id, user_id)
            DO UPDATE SET status = 'pending', created_at = NOW(), decided_at = NULL, decided_by = NULL
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(group_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        tracing::info!("User {} requested to join group {}", user_id, group_id);
        Ok(request)
    }

    /// 待审核申请，最早提交的排在前面
    pub async fn pending(pool: &PgPool, group_id: i64, owner_id: i64) -> AppResult<Vec<PendingRequest>> {
        Group::require_owner(pool, group_id, owner_id, "Only owner can view requests").await?;

        let requests = sqlx::query_as::<_, PendingRequest>(
            r#"
            SELECT r.request_id, r.group_id, r.user_id, r.status, r.created_at,
                   u.email, u.display_name
            FROM group_join_requests r
            JOIN users u ON u.user_id = r.user_id
            WHERE r.group_id = $1 AND r.status = 'pending'
            ORDER BY r.created_at ASC, r.request_id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    async fn find_by_id(pool: &PgPool, request_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, JoinRequest>(&format!(
            "SELECT {} FROM group_join_requests WHERE request_id = $1",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(pool)
        .await
    }

    /// 批准或拒绝一条待审核申请。
    /// 已批准的申请再次批准原样返回；其它对已处理申请的操作返回 409。
    pub async fn decide(
        pool: &PgPool,
        group_id: i64,
        request_id: i64,
        owner_id: i64,
        decision: Decision,
    ) -> AppResult<Self> {
        Group::require_owner(pool, group_id, owner_id, decision.forbidden_message()).await?;

        let request = Self::find_by_id(pool, request_id)
            .await?
            .filter(|r| r.group_id == group_id)
            .ok_or_else(|| AppError::not_found("Request not found"))?;

        if decision.transition(request.status)? == Transition::Unchanged {
            return Ok(request);
        }

        // 成员写入与状态更新在同一事务里
        let mut tx = pool.begin().await?;

        if decision == Decision::Approve {
            insert_membership(&mut *tx, group_id, request.user_id, MemberRole::Member).await?;
        }

        // 只更新仍处于 pending 的行，并发处理时后到的一方得到 409
        let updated = sqlx::query_as::<_, JoinRequest>(&format!(
            r#"
            UPDATE group_join_requests
            SET status = $2, decided_at = NOW(), decided_by = $3
            WHERE request_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(decision.status())
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::conflict("Request has already been decided"))?;

        tx.commit().await?;

        tracing::info!(
            "Join request {} for group {} {} by {}",
            request_id,
            group_id,
            decision.label().to_lowercase(),
            owner_id
        );
        Ok(updated)
    }
}
