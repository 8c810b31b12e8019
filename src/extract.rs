//! 请求提取器别名：提取失败时返回 `AppError`，而不是 axum 默认的纯文本响应

use axum::extract::{Json, Path, Query};
use axum_extra::extract::WithRejection;

use crate::error::AppError;

pub type ApiJson<T> = WithRejection<Json<T>, AppError>;
pub type ApiPath<T> = WithRejection<Path<T>, AppError>;
pub type ApiQuery<T> = WithRejection<Query<T>, AppError>;
