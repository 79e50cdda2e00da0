// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

use crate::domain::repositories::counter_backend::CounterBackend;

/// 默认窗口长度
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// 速率限制错误类型
#[derive(Error, Debug)]
pub enum RateLimitError {
    /// 计数器后端不可用，请求不会被放行
    #[error("Rate limit backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// 准入判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitResult {
    /// 是否放行
    pub allowed: bool,
    /// 本窗口上限
    pub limit: u32,
    /// 本窗口剩余次数
    pub remaining: u32,
    /// 当前窗口结束时间
    pub reset_at: DateTime<Utc>,
    /// 被拒绝时建议的重试等待秒数，放行时为0
    pub retry_after_seconds: u64,
}

/// 固定窗口速率限制器
///
/// 每个调用方标识对应一个计数键，窗口内第一次请求创建该键并设置过期时间。
/// 先原子自增再与上限比较，因此并发请求在计数器处被串行化，
/// 同一窗口内最多放行 `limit` 个请求。被拒绝的请求同样计入计数。
pub struct RateLimiter {
    backend: Arc<dyn CounterBackend>,
    window: Duration,
    key_prefix: String,
    timeout: Duration,
}

impl RateLimiter {
    /// 创建新的速率限制器实例
    ///
    /// # 参数
    ///
    /// * `backend` - 计数器后端
    /// * `window` - 固定窗口长度
    pub fn new(backend: Arc<dyn CounterBackend>, window: Duration) -> Self {
        Self {
            backend,
            window,
            key_prefix: "rate_limit".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    /// 设置后端调用超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn key(&self, identity: &str) -> String {
        format!("{}:{}", self.key_prefix, identity)
    }

    /// 对调用方做准入判定
    ///
    /// # 参数
    ///
    /// * `identity` - 调用方标识
    /// * `limit` - 每窗口请求数上限
    ///
    /// # 返回值
    ///
    /// * `Ok(AdmitResult)` - 判定结果，`allowed=false` 表示超限
    /// * `Err(RateLimitError)` - 计数器后端失败或超时
    pub async fn admit(&self, identity: &str, limit: u32) -> Result<AdmitResult, RateLimitError> {
        let key = self.key(identity);

        let state = match tokio::time::timeout(
            self.timeout,
            self.backend.incr_with_expiry(&key, self.window),
        )
        .await
        {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                error!(identity = %identity, error = %e, "Rate limit backend failed");
                metrics::counter!("rate_limit_decisions_total", "outcome" => "error").increment(1);
                return Err(RateLimitError::BackendUnavailable(e.to_string()));
            }
            Err(_) => {
                error!(identity = %identity, "Rate limit backend timed out");
                metrics::counter!("rate_limit_decisions_total", "outcome" => "error").increment(1);
                return Err(RateLimitError::BackendUnavailable(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        // TTL 未知时按整个窗口计算
        let residual = state
            .ttl
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.window);
        let reset_at = Utc::now() + chrono::Duration::milliseconds(residual.as_millis() as i64);

        let allowed = state.count <= i64::from(limit);
        let remaining = (i64::from(limit) - state.count).max(0) as u32;

        if allowed {
            metrics::counter!("rate_limit_decisions_total", "outcome" => "allowed").increment(1);
            Ok(AdmitResult {
                allowed,
                limit,
                remaining,
                reset_at,
                retry_after_seconds: 0,
            })
        } else {
            let retry_after_seconds = ceil_seconds(residual);
            warn!(
                identity = %identity,
                limit,
                count = state.count,
                retry_after_seconds,
                "Rate limit exceeded"
            );
            metrics::counter!("rate_limit_decisions_total", "outcome" => "rejected").increment(1);
            Ok(AdmitResult {
                allowed,
                limit,
                remaining,
                reset_at,
                retry_after_seconds,
            })
        }
    }

    /// 清除调用方当前窗口的计数
    pub async fn reset(&self, identity: &str) -> Result<(), RateLimitError> {
        self.backend
            .delete(&self.key(identity))
            .await
            .map(|_| ())
            .map_err(|e| RateLimitError::BackendUnavailable(e.to_string()))
    }
}

/// 向上取整到秒，最少1秒
fn ceil_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}
