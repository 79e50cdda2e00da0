// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::models::job::{Job, JobKind, JobResult, JobState, JobTransition};
use crate::domain::repositories::job_repository::{JobRepository, UpdateOutcome};
use crate::infrastructure::cache::cache_manager::JobStatusCache;
use crate::queue::dispatch_queue::{DispatchMessage, DispatchQueue};
use crate::utils::errors::{Dependency, ServiceError};
use crate::utils::timeout::bounded;
use crate::utils::validators::{validate_priority, validate_target_url};

/// 两个逻辑队列的名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQueues {
    pub crawl: String,
    pub recrawl: String,
}

impl Default for JobQueues {
    fn default() -> Self {
        Self {
            crawl: "crawl_queue".to_string(),
            recrawl: "recrawl_queue".to_string(),
        }
    }
}

impl JobQueues {
    pub fn for_kind(&self, kind: JobKind) -> &str {
        match kind {
            JobKind::Crawl => &self.crawl,
            JobKind::Recrawl => &self.recrawl,
        }
    }
}

/// 领取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// 本次调用把任务转为 `Processing`
    Acquired(Job),
    /// 任务已处于 `Processing`
    InProgress,
    /// 任务已结束
    Finished(JobState),
}

/// 任务服务
///
/// 负责任务创建与状态查询，并持有任务状态机：
/// 所有状态转换都经由仓库的条件更新完成，终态不会被覆盖。
pub struct JobService {
    repository: Arc<dyn JobRepository>,
    queue: Arc<dyn DispatchQueue>,
    status_cache: Option<Arc<JobStatusCache>>,
    queues: JobQueues,
    timeout: Duration,
}

impl JobService {
    pub fn new(
        repository: Arc<dyn JobRepository>,
        queue: Arc<dyn DispatchQueue>,
        queues: JobQueues,
        timeout: Duration,
    ) -> Self {
        Self {
            repository,
            queue,
            status_cache: None,
            queues,
            timeout,
        }
    }

    /// 启用任务状态缓存
    pub fn with_status_cache(mut self, cache: Arc<JobStatusCache>) -> Self {
        self.status_cache = Some(cache);
        self
    }

    pub fn queues(&self) -> &JobQueues {
        &self.queues
    }

    /// 提交任务
    ///
    /// 先持久化为 `Pending` 再入队。入队失败时任务被标记为 `Failed`，
    /// 避免留下永远不会被执行的待处理任务。
    ///
    /// # 参数
    ///
    /// * `kind` - 任务类型
    /// * `url` - 目标URL
    /// * `priority` - 优先级，缺省时使用任务类型的默认值
    pub async fn submit(
        &self,
        kind: JobKind,
        url: &str,
        priority: Option<u8>,
    ) -> Result<Job, ServiceError> {
        validate_target_url(url)?;
        let priority = match priority {
            Some(p) => validate_priority(i64::from(p))?,
            None => kind.default_priority(),
        };

        let job = Job::new(kind, url, priority, Utc::now());
        let job = bounded(Dependency::JobStore, self.timeout, self.repository.create(&job)).await?;

        let message = DispatchMessage::from(&job);
        let queue_name = self.queues.for_kind(kind);
        let enqueued = bounded(
            Dependency::DispatchQueue,
            self.timeout,
            self.queue.enqueue(queue_name, &message, message.priority),
        )
        .await;

        let failure = match enqueued {
            Ok(true) => None,
            Ok(false) => Some(ServiceError::unavailable(
                Dependency::DispatchQueue,
                format!("queue '{}' rejected the message", queue_name),
            )),
            Err(e) => Some(e),
        };

        if let Some(err) = failure {
            error!(job_id = %job.id, queue = %queue_name, error = %err, "Job persisted but dispatch failed");
            let transition = JobTransition::Fail {
                completed_at: Utc::now(),
                error: format!("dispatch failed: {}", err),
            };
            if let Err(e) = self.apply(job.id, &transition).await {
                error!(job_id = %job.id, error = %e, "Failed to mark undispatched job as failed");
            }
            return Err(err);
        }

        metrics::counter!("jobs_submitted_total", "kind" => kind.to_string()).increment(1);
        info!(
            job_id = %job.id,
            kind = %kind,
            url = %job.target_url,
            queue = %queue_name,
            priority = message.priority,
            "Job submitted"
        );
        Ok(job)
    }

    /// Pending -> Processing
    ///
    /// 对已处于 `Processing` 的任务重复调用是无操作，返回当前任务且不修改 `started_at`；
    /// 对终态任务调用返回内部错误。
    pub async fn mark_started(&self, id: Uuid) -> Result<Job, ServiceError> {
        let transition = JobTransition::Start {
            started_at: Utc::now(),
        };

        match self.apply(id, &transition).await? {
            UpdateOutcome::Applied(job) => Ok(job),
            UpdateOutcome::NotFound => Err(ServiceError::NotFound(format!("job {}", id))),
            UpdateOutcome::Conflict(JobState::Processing) => {
                debug!(job_id = %id, "Job already processing, ignoring duplicate start");
                self.fetch(id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("job {}", id)))
            }
            UpdateOutcome::Conflict(state) => Err(self.terminal_violation(id, state, &transition)),
        }
    }

    /// 工作器领取任务
    ///
    /// 只有真正完成 Pending -> Processing 转换的调用方拿到 `Acquired`。
    /// 任务已在处理中时返回 `InProgress`，由调用方根据投递次数判断是重复投递
    /// 还是上一次处理未能结束的重新投递。
    pub async fn claim(&self, id: Uuid) -> Result<Claim, ServiceError> {
        let transition = JobTransition::Start {
            started_at: Utc::now(),
        };

        match self.apply(id, &transition).await? {
            UpdateOutcome::Applied(job) => Ok(Claim::Acquired(job)),
            UpdateOutcome::NotFound => Err(ServiceError::NotFound(format!("job {}", id))),
            UpdateOutcome::Conflict(JobState::Processing) => Ok(Claim::InProgress),
            UpdateOutcome::Conflict(state) => Ok(Claim::Finished(state)),
        }
    }

    /// -> Completed，记录完成时间和结果
    pub async fn mark_completed(&self, id: Uuid, result: JobResult) -> Result<Job, ServiceError> {
        let transition = JobTransition::Complete {
            completed_at: Utc::now(),
            result,
        };
        self.finish(id, transition).await
    }

    /// -> Failed，记录完成时间和失败原因
    pub async fn mark_failed(&self, id: Uuid, error: impl Into<String>) -> Result<Job, ServiceError> {
        let transition = JobTransition::Fail {
            completed_at: Utc::now(),
            error: error.into(),
        };
        self.finish(id, transition).await
    }

    /// 查询任务状态
    ///
    /// 先查缓存，缓存不可用时直接读任务存储
    pub async fn get_status(&self, id: Uuid) -> Result<Option<Job>, ServiceError> {
        if let Some(cache) = &self.status_cache {
            match cache.get(id).await {
                Ok(Some(job)) => return Ok(Some(job)),
                Ok(None) => {}
                Err(e) => warn!(job_id = %id, error = %e, "Job status cache unavailable"),
            }
        }

        let job = self.fetch(id).await?;

        if let (Some(cache), Some(job)) = (&self.status_cache, &job) {
            if let Err(e) = cache.put(job).await {
                warn!(job_id = %id, error = %e, "Failed to cache job status");
            }
        }

        Ok(job)
    }

    async fn finish(&self, id: Uuid, transition: JobTransition) -> Result<Job, ServiceError> {
        match self.apply(id, &transition).await? {
            UpdateOutcome::Applied(job) => {
                if job.completed_at.is_some_and(|at| job.sla_breached_at(at)) {
                    metrics::counter!("job_sla_breaches_total").increment(1);
                    warn!(
                        job_id = %id,
                        sla_deadline = ?job.sla_deadline,
                        completed_at = ?job.completed_at,
                        "Job finished after its SLA deadline"
                    );
                }
                Ok(job)
            }
            UpdateOutcome::NotFound => Err(ServiceError::NotFound(format!("job {}", id))),
            UpdateOutcome::Conflict(state) => Err(self.terminal_violation(id, state, &transition)),
        }
    }

    async fn apply(&self, id: Uuid, transition: &JobTransition) -> Result<UpdateOutcome, ServiceError> {
        let outcome = bounded(
            Dependency::JobStore,
            self.timeout,
            self.repository.update(id, transition),
        )
        .await?;

        if let UpdateOutcome::Applied(job) = &outcome {
            let to = transition.target_state();
            metrics::counter!("job_transitions_total", "to" => to.to_string()).increment(1);
            info!(job_id = %id, state = %to, "Job state updated");
            self.evict(job.id).await;
        }

        Ok(outcome)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Job>, ServiceError> {
        bounded(Dependency::JobStore, self.timeout, self.repository.find_by_id(id)).await
    }

    async fn evict(&self, id: Uuid) {
        if let Some(cache) = &self.status_cache {
            if let Err(e) = cache.evict(id).await {
                warn!(job_id = %id, error = %e, "Failed to evict job status cache entry");
            }
        }
    }

    fn terminal_violation(&self, id: Uuid, state: JobState, transition: &JobTransition) -> ServiceError {
        metrics::counter!("job_transition_conflicts_total").increment(1);
        error!(
            job_id = %id,
            current_state = %state,
            attempted = %transition.target_state(),
            "Rejected transition on finished job, possible duplicate delivery"
        );
        ServiceError::Internal(format!(
            "job {} is already {}; refusing transition to {} (possible duplicate delivery)",
            id,
            state,
            transition.target_state()
        ))
    }
}
