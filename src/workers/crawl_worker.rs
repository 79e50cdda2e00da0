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

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::services::job_service::{Claim, JobService};
use crate::engines::traits::CrawlExecutor;
use crate::queue::dispatch_queue::{Delivery, DispatchQueue};
use crate::utils::errors::{ServiceError, WorkerError};
use crate::workers::worker::Worker;

/// 单条消息的最大投递次数，可重试的抓取错误在此之前会被退回队列
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// 抓取工作器
///
/// 先消费重新抓取队列再消费普通抓取队列，保证有时限的任务优先执行。
/// 每条消息依次经过领取、执行和结束三个步骤，只有任务进入终态后才确认消息；
/// 结束步骤失败时消息退回队列，由下一次投递继续处理。
pub struct CrawlWorker {
    jobs: Arc<JobService>,
    queue: Arc<dyn DispatchQueue>,
    executor: Arc<dyn CrawlExecutor>,
    max_attempts: u32,
    name: String,
}

impl CrawlWorker {
    /// 创建新的抓取工作器实例
    pub fn new(
        jobs: Arc<JobService>,
        queue: Arc<dyn DispatchQueue>,
        executor: Arc<dyn CrawlExecutor>,
    ) -> Self {
        Self {
            jobs,
            queue,
            executor,
            max_attempts: MAX_DELIVERY_ATTEMPTS,
            name: format!("crawl-worker-{}", Uuid::new_v4()),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    async fn next_delivery(&self) -> Result<Option<Delivery>, WorkerError> {
        let queues = self.jobs.queues();
        for queue_name in [queues.recrawl.as_str(), queues.crawl.as_str()] {
            if let Some(delivery) = self.queue.dequeue(queue_name).await? {
                return Ok(Some(delivery));
            }
        }
        Ok(None)
    }

    #[instrument(
        skip(self, delivery),
        fields(
            job_id = %delivery.message.job_id,
            kind = %delivery.message.kind,
            url = %delivery.message.url,
            attempts = delivery.attempts
        )
    )]
    async fn process(&self, delivery: Delivery) -> Result<(), WorkerError> {
        let job_id = delivery.message.job_id;

        match self.jobs.claim(job_id).await {
            Ok(Claim::Acquired(_)) => {}
            Ok(Claim::InProgress) if delivery.is_redelivery() => {
                info!("Resuming job left in progress by an earlier delivery");
            }
            Ok(Claim::InProgress) => {
                metrics::counter!("job_duplicate_deliveries_total").increment(1);
                warn!("Duplicate delivery, job already claimed");
                return self.ack(&delivery).await;
            }
            Ok(Claim::Finished(state)) => {
                metrics::counter!("job_duplicate_deliveries_total").increment(1);
                warn!(current_state = %state, "Duplicate delivery, job already finished");
                return self.ack(&delivery).await;
            }
            Err(ServiceError::NotFound(_)) => {
                warn!("Dropping message for unknown job");
                return self.ack(&delivery).await;
            }
            Err(e) => {
                self.requeue(&delivery).await;
                return Err(e.into());
            }
        }

        let finished = match self.executor.execute(&delivery.message).await {
            Ok(result) => {
                info!(executor = self.executor.name(), "Job executed");
                self.jobs.mark_completed(job_id, result).await
            }
            Err(e) if e.is_retryable() && delivery.attempts < self.max_attempts => {
                metrics::counter!("job_retries_total").increment(1);
                warn!(executor = self.executor.name(), error = %e, "Retryable fetch failure, requeueing");
                self.queue.nack(&delivery, true).await?;
                return Ok(());
            }
            Err(e) => {
                warn!(executor = self.executor.name(), error = %e, retryable = e.is_retryable(), "Job execution failed");
                self.jobs.mark_failed(job_id, e.to_string()).await
            }
        };

        match finished {
            Ok(_) | Err(ServiceError::NotFound(_)) => self.ack(&delivery).await,
            // 另一个工作器已经结束了该任务
            Err(ServiceError::Internal(detail)) => {
                error!(detail = %detail, "Dropping result for already finished job");
                self.ack(&delivery).await
            }
            Err(e) => {
                self.requeue(&delivery).await;
                Err(e.into())
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), WorkerError> {
        self.queue.ack(delivery).await?;
        Ok(())
    }

    /// 退回失败时消息仍在租约中，租约到期后会重新投递
    async fn requeue(&self, delivery: &Delivery) {
        if let Err(e) = self.queue.nack(delivery, true).await {
            error!(error = %e, "Failed to requeue message");
        }
    }
}

#[async_trait]
impl Worker for CrawlWorker {
    async fn run_once(&self) -> Result<bool, WorkerError> {
        match self.next_delivery().await? {
            Some(delivery) => {
                self.process(delivery).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
