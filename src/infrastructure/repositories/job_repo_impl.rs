// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::job::{Job, JobKind, JobOutcome, JobResult, JobState, JobTransition};
use crate::domain::repositories::job_repository::{
    JobRepository, RepositoryError, UpdateOutcome,
};
use crate::infrastructure::database::entities::crawl_job;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 任务仓库实现
///
/// 基于SeaORM实现的任务数据访问层，状态转换使用带状态条件的 `UPDATE`
#[derive(Clone)]
pub struct JobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl JobRepositoryImpl {
    /// 创建新的任务仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn to_db_time(ts: DateTime<Utc>) -> DateTime<FixedOffset> {
    ts.fixed_offset()
}

fn corrupt(id: Uuid, detail: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Corrupt(format!("job {}: {}", id, detail))
}

impl TryFrom<crawl_job::Model> for Job {
    type Error = RepositoryError;

    fn try_from(model: crawl_job::Model) -> Result<Self, Self::Error> {
        let id = model.id;
        let kind: JobKind = model.kind.parse().map_err(|e| corrupt(id, e))?;
        let state: JobState = model.state.parse().map_err(|e| corrupt(id, e))?;
        let priority = u8::try_from(model.priority).map_err(|e| corrupt(id, e))?;

        let outcome = match state {
            JobState::Completed => {
                let result = match model.result {
                    Some(value) => {
                        serde_json::from_value::<JobResult>(value).map_err(|e| corrupt(id, e))?
                    }
                    None => JobResult::default(),
                };
                Some(JobOutcome::Completed { result })
            }
            JobState::Failed => Some(JobOutcome::Failed {
                error: model.error.unwrap_or_default(),
            }),
            JobState::Pending | JobState::Processing => None,
        };

        Ok(Job {
            id,
            kind,
            target_url: model.target_url,
            priority,
            state,
            created_at: model.created_at.with_timezone(&Utc),
            started_at: model.started_at.map(|ts| ts.with_timezone(&Utc)),
            completed_at: model.completed_at.map(|ts| ts.with_timezone(&Utc)),
            sla_deadline: model.sla_deadline.map(|ts| ts.with_timezone(&Utc)),
            outcome,
        })
    }
}

impl TryFrom<&Job> for crawl_job::ActiveModel {
    type Error = RepositoryError;

    fn try_from(job: &Job) -> Result<Self, Self::Error> {
        let result = job
            .result()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| corrupt(job.id, e))?;

        Ok(Self {
            id: Set(job.id),
            kind: Set(job.kind.to_string()),
            target_url: Set(job.target_url.clone()),
            priority: Set(i32::from(job.priority)),
            state: Set(job.state.to_string()),
            created_at: Set(to_db_time(job.created_at)),
            started_at: Set(job.started_at.map(to_db_time)),
            completed_at: Set(job.completed_at.map(to_db_time)),
            sla_deadline: Set(job.sla_deadline.map(to_db_time)),
            result: Set(result),
            error: Set(job.error().map(str::to_string)),
            updated_at: Set(to_db_time(Utc::now())),
        })
    }
}

#[async_trait]
impl JobRepository for JobRepositoryImpl {
    async fn create(&self, job: &Job) -> Result<Job, RepositoryError> {
        let model = crawl_job::ActiveModel::try_from(job)?;

        model.insert(self.db.as_ref()).await?;
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        let model = crawl_job::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        model.map(Job::try_from).transpose()
    }

    async fn update(
        &self,
        id: Uuid,
        transition: &JobTransition,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let allowed: Vec<String> = transition
            .allowed_from()
            .iter()
            .map(ToString::to_string)
            .collect();

        let mut update = crawl_job::Entity::update_many()
            .col_expr(
                crawl_job::Column::State,
                Expr::value(transition.target_state().to_string()),
            )
            .col_expr(
                crawl_job::Column::UpdatedAt,
                Expr::value(to_db_time(Utc::now())),
            );

        // 每种转换只写入自己的字段
        update = match transition {
            JobTransition::Start { started_at } => update.col_expr(
                crawl_job::Column::StartedAt,
                Expr::value(to_db_time(*started_at)),
            ),
            JobTransition::Complete {
                completed_at,
                result,
            } => {
                let result = serde_json::to_value(result).map_err(|e| corrupt(id, e))?;
                update
                    .col_expr(
                        crawl_job::Column::CompletedAt,
                        Expr::value(to_db_time(*completed_at)),
                    )
                    .col_expr(crawl_job::Column::Result, Expr::value(result))
            }
            JobTransition::Fail {
                completed_at,
                error,
            } => update
                .col_expr(
                    crawl_job::Column::CompletedAt,
                    Expr::value(to_db_time(*completed_at)),
                )
                .col_expr(crawl_job::Column::Error, Expr::value(error.clone())),
        };

        let result = update
            .filter(crawl_job::Column::Id.eq(id))
            .filter(crawl_job::Column::State.is_in(allowed))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected > 0 {
            return match self.find_by_id(id).await? {
                Some(job) => Ok(UpdateOutcome::Applied(job)),
                None => Err(corrupt(id, "row disappeared after update")),
            };
        }

        match self.find_by_id(id).await? {
            Some(job) => Ok(UpdateOutcome::Conflict(job.state)),
            None => Ok(UpdateOutcome::NotFound),
        }
    }
}
