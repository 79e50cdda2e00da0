// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobState, JobTransition};
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 存储的数据无法还原为领域模型
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// 条件更新的结果
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// 更新已生效，返回更新后的任务
    Applied(Job),
    /// 任务不存在
    NotFound,
    /// 当前状态不在允许集合内，未做任何修改
    Conflict(JobState),
}

/// 任务仓库特质
///
/// 定义任务数据访问接口。`update` 必须是原子的条件更新：
/// 只有当前状态属于 `transition.allowed_from()` 时才写入转换声明的字段。
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 创建新任务
    async fn create(&self, job: &Job) -> Result<Job, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError>;
    /// 条件更新任务状态
    async fn update(
        &self,
        id: Uuid,
        transition: &JobTransition,
    ) -> Result<UpdateOutcome, RepositoryError>;
}
