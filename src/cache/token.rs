use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;

use crate::utils::token_fingerprint;

const REVOKED_TOKEN_PREFIX: &str = "token:revoked:";

/// 令牌吊销操作
pub struct TokenCacheOperations;

impl TokenCacheOperations {
    fn key(token: &str) -> String {
        format!("{}{}", REVOKED_TOKEN_PREFIX, token_fingerprint(token))
    }

    /// 记录已注销的令牌，保留到令牌本身过期为止
    pub async fn revoke_token(
        redis: &Arc<RedisClient>,
        token: &str,
        expires_at: i64,
    ) -> Result<(), redis::RedisError> {
        let ttl = expires_at - chrono::Utc::now().timestamp();
        if ttl <= 0 {
            return Ok(());
        }

        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(Self::key(token), 1, ttl as u64).await?;

        Ok(())
    }

    pub async fn is_revoked(
        redis: &Arc<RedisClient>,
        token: &str,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let exists: bool = conn.exists(Self::key(token)).await?;

        Ok(exists)
    }
}
