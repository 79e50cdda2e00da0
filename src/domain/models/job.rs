// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 最高优先级
pub const MAX_PRIORITY: u8 = 10;

/// 重新爬取任务的SLA时长（秒）
pub const RECRAWL_SLA_SECONDS: i64 = 3600;

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 非法状态转换
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: JobState, to: JobState },
    /// 输入校验失败
    #[error("Validation error: {0}")]
    Validation(String),
}

/// 爬取任务实体
///
/// 任务创建时为 `Pending`，由工作器推进到 `Processing`，
/// 最终进入 `Completed` 或 `Failed` 终态。终态之后不再变化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 任务类型
    pub kind: JobKind,
    /// 目标URL
    pub target_url: String,
    /// 调用方请求的优先级 (0-10)
    pub priority: u8,
    /// 当前状态
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// SLA截止时间，仅重新爬取任务存在
    pub sla_deadline: Option<DateTime<Utc>>,
    /// 终态结果
    pub outcome: Option<JobOutcome>,
}

impl Job {
    /// 创建新的待处理任务
    ///
    /// # 参数
    ///
    /// * `kind` - 任务类型
    /// * `target_url` - 目标URL
    /// * `priority` - 优先级，超过上限时截断为 `MAX_PRIORITY`
    /// * `now` - 创建时间
    pub fn new(kind: JobKind, target_url: impl Into<String>, priority: u8, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target_url: target_url.into(),
            priority: priority.min(MAX_PRIORITY),
            state: JobState::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            sla_deadline: kind.sla().map(|sla| now + sla),
            outcome: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// 完成结果（仅 `Completed` 状态存在）
    pub fn result(&self) -> Option<&JobResult> {
        match &self.outcome {
            Some(JobOutcome::Completed { result }) => Some(result),
            _ => None,
        }
    }

    /// 失败原因（仅 `Failed` 状态存在）
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(JobOutcome::Failed { error }) => Some(error.as_str()),
            _ => None,
        }
    }

    /// 在给定时间点是否已超过SLA截止时间
    pub fn sla_breached_at(&self, at: DateTime<Utc>) -> bool {
        self.sla_deadline.is_some_and(|deadline| at > deadline)
    }

    /// 在内存中应用状态转换
    ///
    /// 只修改转换声明的字段；当前状态不在允许集合内时返回错误且不做任何修改。
    /// 持久化层使用相同的允许集合做条件更新。
    pub fn apply(&mut self, transition: &JobTransition) -> Result<(), DomainError> {
        if !transition.allowed_from().contains(&self.state) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state,
                to: transition.target_state(),
            });
        }

        match transition {
            JobTransition::Start { started_at } => {
                self.started_at = Some(*started_at);
            }
            JobTransition::Complete {
                completed_at,
                result,
            } => {
                self.completed_at = Some(*completed_at);
                self.outcome = Some(JobOutcome::Completed {
                    result: result.clone(),
                });
            }
            JobTransition::Fail {
                completed_at,
                error,
            } => {
                self.completed_at = Some(*completed_at);
                self.outcome = Some(JobOutcome::Failed {
                    error: error.clone(),
                });
            }
        }
        self.state = transition.target_state();
        Ok(())
    }
}

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// 普通爬取
    Crawl,
    /// 有SLA约束的重新爬取
    Recrawl,
}

impl JobKind {
    /// SLA时长，只有重新爬取任务有
    pub fn sla(&self) -> Option<Duration> {
        match self {
            JobKind::Crawl => None,
            JobKind::Recrawl => Some(Duration::seconds(RECRAWL_SLA_SECONDS)),
        }
    }

    /// 调用方未指定时的默认优先级
    pub fn default_priority(&self) -> u8 {
        match self {
            JobKind::Crawl => 0,
            JobKind::Recrawl => MAX_PRIORITY,
        }
    }

    /// 入队时使用的优先级
    ///
    /// 重新爬取总是以最高优先级分发，与调用方请求的优先级无关
    pub fn dispatch_priority(&self, requested: u8) -> u8 {
        match self {
            JobKind::Crawl => requested.min(MAX_PRIORITY),
            JobKind::Recrawl => MAX_PRIORITY,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobKind::Crawl => write!(f, "crawl"),
            JobKind::Recrawl => write!(f, "recrawl"),
        }
    }
}

impl FromStr for JobKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crawl" => Ok(JobKind::Crawl),
            "recrawl" => Ok(JobKind::Recrawl),
            other => Err(DomainError::Validation(format!("unknown job kind: {}", other))),
        }
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Processing => write!(f, "processing"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(DomainError::Validation(format!("unknown job state: {}", other))),
        }
    }
}

/// 任务执行结果
///
/// 字段固定，可选字段缺省时不序列化，`{"pages_crawled":1}` 可以原样往返
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobResult {
    /// 抓取的页面数
    pub pages_crawled: u32,
    /// 写入索引的文档数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_indexed: Option<u32>,
    /// 最终HTTP状态码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// 响应体字节数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// 响应体SHA-256
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// 任务终态结果
///
/// 完成结果与失败原因互斥
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobOutcome {
    Completed { result: JobResult },
    Failed { error: String },
}

/// 状态转换
///
/// 每种转换声明它允许的起始状态集合和它会写入的字段
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    /// Pending -> Processing，写入 `state, started_at`
    Start { started_at: DateTime<Utc> },
    /// -> Completed，写入 `state, completed_at, result`
    Complete {
        completed_at: DateTime<Utc>,
        result: JobResult,
    },
    /// -> Failed，写入 `state, completed_at, error`
    Fail {
        completed_at: DateTime<Utc>,
        error: String,
    },
}

impl JobTransition {
    pub fn target_state(&self) -> JobState {
        match self {
            JobTransition::Start { .. } => JobState::Processing,
            JobTransition::Complete { .. } => JobState::Completed,
            JobTransition::Fail { .. } => JobState::Failed,
        }
    }

    /// 允许的起始状态
    pub fn allowed_from(&self) -> &'static [JobState] {
        match self {
            JobTransition::Start { .. } => &[JobState::Pending],
            JobTransition::Complete { .. } | JobTransition::Fail { .. } => {
                &[JobState::Pending, JobState::Processing]
            }
        }
    }
}
