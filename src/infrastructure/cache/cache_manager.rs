// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::models::job::Job;
use crate::domain::models::search::{normalize_query_text, SearchQuery};
use crate::domain::repositories::counter_backend::CounterBackend;
use crate::utils::errors::{Dependency, ServiceError};
use crate::utils::glob::escape_glob;
use crate::utils::timeout::bounded;

/// 搜索结果缓存键前缀
pub const SEARCH_KEY_PREFIX: &str = "search";

/// 任务状态缓存键前缀
pub const JOB_KEY_PREFIX: &str = "job";

/// 标识符超过该长度时改用哈希
pub const MAX_IDENTIFIER_CHARS: usize = 100;

/// 默认搜索结果缓存时间
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(1800);

/// 生成缓存键
///
/// 标识符不超过100字符时原样使用，否则使用其 SHA-256 十六进制摘要
pub fn generate_cache_key(prefix: &str, identifier: &str) -> String {
    if identifier.chars().count() > MAX_IDENTIFIER_CHARS {
        let digest = Sha256::digest(identifier.as_bytes());
        format!("{}:{}", prefix, hex::encode(digest))
    } else {
        format!("{}:{}", prefix, identifier)
    }
}

/// 缓存条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub stored_at: DateTime<Utc>,
}

/// 搜索结果缓存
///
/// 旁路缓存：调用方先 `lookup`，未命中时查询索引再 `store`。
/// 所有方法都受超时约束，失败时返回 `DependencyUnavailable`，是否降级由调用方决定。
pub struct SearchCache {
    backend: Arc<dyn CounterBackend>,
    default_ttl: Duration,
    timeout: Duration,
}

impl SearchCache {
    pub fn new(backend: Arc<dyn CounterBackend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 查询对应的缓存键
    ///
    /// 大小写和首尾空白不同的查询共用一个键，`(text, page, page_size)` 不同则键不同
    pub fn key_for(query: &SearchQuery) -> String {
        let identifier = format!(
            "{}:p{}:s{}",
            query.normalized_text(),
            query.page(),
            query.page_size()
        );
        generate_cache_key(SEARCH_KEY_PREFIX, &identifier)
    }

    /// 读取缓存条目
    ///
    /// 无法解析的条目视为未命中并被删除
    pub async fn lookup<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<CacheEntry<T>>, ServiceError> {
        let raw = bounded(Dependency::CounterBackend, self.timeout, self.backend.get(key)).await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                if let Err(e) = bounded(
                    Dependency::CounterBackend,
                    self.timeout,
                    self.backend.delete(key),
                )
                .await
                {
                    warn!(key = %key, error = %e, "Failed to delete unreadable cache entry");
                }
                Ok(None)
            }
        }
    }

    /// 写入缓存条目，`ttl` 为空时使用默认缓存时间
    pub async fn store<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
        ttl: Option<Duration>,
    ) -> Result<(), ServiceError> {
        let entry = CacheEntry {
            payload,
            stored_at: Utc::now(),
        };
        let raw = serde_json::to_string(&entry)
            .map_err(|e| ServiceError::Internal(format!("failed to encode cache entry: {}", e)))?;

        bounded(
            Dependency::CounterBackend,
            self.timeout,
            self.backend
                .set_with_expiry(key, &raw, ttl.unwrap_or(self.default_ttl)),
        )
        .await
    }

    /// 删除所有匹配 glob 模式的条目
    pub async fn invalidate(&self, pattern: &str) -> Result<u64, ServiceError> {
        let removed = bounded(
            Dependency::CounterBackend,
            self.timeout,
            self.backend.delete_pattern(pattern),
        )
        .await?;
        debug!(pattern = %pattern, removed, "Invalidated cache entries");
        Ok(removed)
    }

    /// 删除某个查询所有分页组合的条目
    ///
    /// 超过长度阈值而被哈希的键无法按前缀匹配，不在清理范围内
    pub async fn invalidate_query(&self, text: &str) -> Result<u64, ServiceError> {
        let pattern = format!(
            "{}:{}:*",
            SEARCH_KEY_PREFIX,
            escape_glob(&normalize_query_text(text))
        );
        self.invalidate(&pattern).await
    }

    /// 清空全部搜索结果缓存
    pub async fn clear_all(&self) -> Result<u64, ServiceError> {
        self.invalidate(&format!("{}:*", SEARCH_KEY_PREFIX)).await
    }
}

/// 任务状态缓存
///
/// 只作为读路径的加速层，终态正确性以任务存储为准
pub struct JobStatusCache {
    backend: Arc<dyn CounterBackend>,
    terminal_ttl: Duration,
    pending_ttl: Duration,
    timeout: Duration,
}

impl JobStatusCache {
    pub fn new(
        backend: Arc<dyn CounterBackend>,
        terminal_ttl: Duration,
        pending_ttl: Duration,
    ) -> Self {
        Self {
            backend,
            terminal_ttl,
            pending_ttl,
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn key_for(id: Uuid) -> String {
        generate_cache_key(JOB_KEY_PREFIX, &id.to_string())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Job>, ServiceError> {
        let key = Self::key_for(id);
        let raw = bounded(Dependency::CounterBackend, self.timeout, self.backend.get(&key)).await?;
        Ok(raw.and_then(|raw| match serde_json::from_str::<Job>(&raw) {
            Ok(job) => Some(job),
            Err(e) => {
                warn!(job_id = %id, error = %e, "Ignoring unreadable job status entry");
                None
            }
        }))
    }

    /// 缓存任务快照，终态使用较长的缓存时间
    pub async fn put(&self, job: &Job) -> Result<(), ServiceError> {
        let raw = serde_json::to_string(job)
            .map_err(|e| ServiceError::Internal(format!("failed to encode job: {}", e)))?;
        let ttl = if job.is_terminal() {
            self.terminal_ttl
        } else {
            self.pending_ttl
        };
        bounded(
            Dependency::CounterBackend,
            self.timeout,
            self.backend.set_with_expiry(&Self::key_for(job.id), &raw, ttl),
        )
        .await
    }

    pub async fn evict(&self, id: Uuid) -> Result<(), ServiceError> {
        bounded(
            Dependency::CounterBackend,
            self.timeout,
            self.backend.delete(&Self::key_for(id)),
        )
        .await
        .map(|_| ())
    }
}
