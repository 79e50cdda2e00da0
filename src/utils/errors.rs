// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::domain::models::job::DomainError;
use crate::domain::repositories::counter_backend::CounterBackendError;
use crate::domain::repositories::job_repository::RepositoryError;
use crate::domain::search::index::IndexError;
use crate::domain::services::rate_limiting_service::RateLimitError;
use crate::queue::dispatch_queue::QueueError;
use crate::utils::validators::ValidationError;

/// 外部依赖
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// 任务存储
    JobStore,
    /// 分发队列
    DispatchQueue,
    /// 搜索索引
    SearchIndex,
    /// 计数器与缓存后端
    CounterBackend,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dependency::JobStore => write!(f, "job_store"),
            Dependency::DispatchQueue => write!(f, "dispatch_queue"),
            Dependency::SearchIndex => write!(f, "search_index"),
            Dependency::CounterBackend => write!(f, "counter_backend"),
        }
    }
}

/// 服务层错误类型
///
/// 面向调用方的错误分类，表示层据此决定HTTP状态码
#[derive(Error, Debug)]
pub enum ServiceError {
    /// 输入校验失败，没有产生任何副作用
    #[error("Validation error: {0}")]
    Validation(String),

    /// 超出速率限制
    #[error("Rate limit exceeded: retry after {retry_after_seconds}s")]
    RateLimitExceeded {
        limit: u32,
        retry_after_seconds: u64,
        reset_at: DateTime<Utc>,
    },

    /// 外部依赖不可用或超时
    #[error("Dependency {dependency} unavailable: {detail}")]
    DependencyUnavailable {
        dependency: Dependency,
        detail: String,
    },

    /// 资源不存在
    #[error("Not found: {0}")]
    NotFound(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn unavailable(dependency: Dependency, detail: impl Into<String>) -> Self {
        ServiceError::DependencyUnavailable {
            dependency,
            detail: detail.into(),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => ServiceError::unavailable(Dependency::JobStore, e.to_string()),
            RepositoryError::Corrupt(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<QueueError> for ServiceError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Serialization(e) => ServiceError::Internal(e.to_string()),
            QueueError::UnknownDelivery(_) => ServiceError::Internal(err.to_string()),
            other => ServiceError::unavailable(Dependency::DispatchQueue, other.to_string()),
        }
    }
}

impl From<IndexError> for ServiceError {
    fn from(err: IndexError) -> Self {
        ServiceError::unavailable(Dependency::SearchIndex, err.to_string())
    }
}

impl From<CounterBackendError> for ServiceError {
    fn from(err: CounterBackendError) -> Self {
        ServiceError::unavailable(Dependency::CounterBackend, err.to_string())
    }
}

impl From<RateLimitError> for ServiceError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::BackendUnavailable(detail) => {
                ServiceError::unavailable(Dependency::CounterBackend, detail)
            }
        }
    }
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("队列错误: {0}")]
    QueueError(String),

    #[error("服务错误: {0}")]
    ServiceError(#[from] ServiceError),
}

impl From<QueueError> for WorkerError {
    fn from(err: QueueError) -> Self {
        WorkerError::QueueError(err.to_string())
    }
}
