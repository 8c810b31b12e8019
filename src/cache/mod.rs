// 缓存模块
// 目前只有令牌吊销表，限流计数器在 middleware::rate_limit 里

pub mod token;

pub use token::TokenCacheOperations;
