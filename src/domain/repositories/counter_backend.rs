// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 计数器后端错误类型
#[derive(Error, Debug)]
pub enum CounterBackendError {
    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    /// 后端不可用
    #[error("Counter backend unavailable: {0}")]
    Unavailable(String),
}

/// 原子自增后的计数器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    /// 自增后的值
    pub count: i64,
    /// 剩余存活时间，未知时为 `None`
    pub ttl: Option<Duration>,
}

/// 计数器后端特质
///
/// 限流计数、搜索结果缓存和任务状态缓存共用的键值存储抽象。
/// `incr_with_expiry` 必须是原子操作：并发调用者看到的计数严格递增，
/// 且只在键首次创建时设置过期时间。
#[async_trait]
pub trait CounterBackend: Send + Sync {
    /// 原子自增，键不存在时创建并设置过期时间
    async fn incr_with_expiry(
        &self,
        key: &str,
        expiry: Duration,
    ) -> Result<CounterState, CounterBackendError>;

    /// 读取字符串值
    async fn get(&self, key: &str) -> Result<Option<String>, CounterBackendError>;

    /// 写入字符串值并设置过期时间
    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry: Duration,
    ) -> Result<(), CounterBackendError>;

    /// 剩余存活时间
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CounterBackendError>;

    /// 删除键，返回键是否存在
    async fn delete(&self, key: &str) -> Result<bool, CounterBackendError>;

    /// 删除所有匹配 glob 模式的键，返回删除数量
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CounterBackendError>;
}
