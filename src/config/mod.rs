use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub share_secret: String,
    pub share_ttl_secs: Option<u64>,
    pub frontend_base_url: String,
    pub api_base_uri: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    /// 只有部署在反向代理后面时才信任 X-Real-IP / X-Forwarded-For
    pub trust_proxy_headers: bool,
    pub server_host: String,
    pub server_port: u16,
    pub db_max_connections: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("{key} is out of range (max {max} hours)")]
    OutOfRange { key: &'static str, max: u64 },
}

/// 小时类配置的上限，保证换算成秒、再加到当前时间上都不会溢出
pub const MAX_HOURS: u64 = 24 * 365 * 100;

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

/// 读取可选环境变量，解析失败时使用默认值
fn var_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 小时数，兼容 "24h" 这种写法
fn parse_hours(raw: &str) -> Option<u64> {
    raw.trim().trim_end_matches('h').parse::<u64>().ok()
}

fn hours_to_secs(key: &'static str, hours: u64) -> Result<u64, ConfigError> {
    if hours > MAX_HOURS {
        return Err(ConfigError::OutOfRange { key, max: MAX_HOURS });
    }
    hours
        .checked_mul(3600)
        .ok_or(ConfigError::OutOfRange { key, max: MAX_HOURS })
}

fn hours_secs(key: &'static str) -> Result<Option<u64>, ConfigError> {
    env::var(key)
        .ok()
        .and_then(|v| parse_hours(&v))
        .map(|h| hours_to_secs(key, h))
        .transpose()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_secs: hours_secs("JWT_EXPIRATION")?.unwrap_or(3600),
            share_secret: required("FAVORITES_SHARE_SECRET")?,
            share_ttl_secs: hours_secs("FAVORITES_SHARE_TTL")?,
            frontend_base_url: env::var("FRONTEND_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into())
                .trim_end_matches('/')
                .to_string(),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
            rate_limit_window_secs: var_or("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: var_or("RATE_LIMIT_REQUESTS", 100),
            trust_proxy_headers: var_or("TRUST_PROXY_HEADERS", false),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".into()),
            server_port: var_or("SERVER_PORT", 3000),
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 10),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn share_ttl(&self) -> Option<Duration> {
        self.share_ttl_secs.map(Duration::from_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
