// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::job::{Job, JobKind, JobResult};

/// 任务创建响应
#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponseDto {
    pub job_id: Uuid,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub sla_deadline: Option<DateTime<Utc>>,
}

impl From<&Job> for JobResponseDto {
    fn from(job: &Job) -> Self {
        let message = match job.kind {
            JobKind::Crawl => format!("Crawl job queued for {}", job.target_url),
            JobKind::Recrawl => format!(
                "Recrawl job queued for {} with a 1 hour SLA",
                job.target_url
            ),
        };
        Self {
            job_id: job.id,
            status: job.state.to_string(),
            message,
            created_at: job.created_at,
            sla_deadline: job.sla_deadline,
        }
    }
}

/// 任务状态响应
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponseDto {
    pub job_id: Uuid,
    pub job_type: String,
    pub url: String,
    pub status: String,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub result: Option<JobResult>,
    pub error: Option<String>,
}

impl From<Job> for JobStatusResponseDto {
    fn from(job: Job) -> Self {
        let result = job.result().cloned();
        let error = job.error().map(str::to_string);
        Self {
            job_id: job.id,
            job_type: job.kind.to_string(),
            url: job.target_url,
            status: job.state.to_string(),
            priority: job.priority,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            sla_deadline: job.sla_deadline,
            result,
            error,
        }
    }
}
