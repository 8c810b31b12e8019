//! 收藏分享签名
//!
//! 签名本身就是访问凭证：持有 `sig` 的任何人都能读取对应用户的收藏列表。
//! 每次签发都混入一个随机 nonce，重新签发后旧链接立即失效。

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// 为用户签发新的分享签名（小写十六进制）
pub fn sign_share(secret: &str, user_id: i64) -> String {
    sign_with_nonce(secret, user_id, &Uuid::new_v4().simple().to_string())
}

fn sign_with_nonce(secret: &str, user_id: i64, nonce: &str) -> String {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{}:{}", user_id, nonce).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// 常量时间比较，长度不同直接判定不匹配
pub fn signatures_match(stored: &str, provided: &str) -> bool {
    let (a, b) = (stored.as_bytes(), provided.as_bytes());
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
