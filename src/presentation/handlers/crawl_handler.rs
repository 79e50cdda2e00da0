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

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    application::dto::{crawl_request::CrawlRequestDto, job_response::JobResponseDto},
    domain::{models::job::JobKind, services::job_service::JobService},
    presentation::errors::AppError,
};

/// 创建抓取任务，缺省优先级为0
pub async fn create_crawl(
    Extension(jobs): Extension<Arc<JobService>>,
    payload: Result<Json<CrawlRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<JobResponseDto>), AppError> {
    submit(&jobs, JobKind::Crawl, payload).await
}

/// 创建重新抓取任务
///
/// 以最高优先级分发，截止时间为创建后1小时
pub async fn create_recrawl(
    Extension(jobs): Extension<Arc<JobService>>,
    payload: Result<Json<CrawlRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<JobResponseDto>), AppError> {
    submit(&jobs, JobKind::Recrawl, payload).await
}

async fn submit(
    jobs: &JobService,
    kind: JobKind,
    payload: Result<Json<CrawlRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<JobResponseDto>), AppError> {
    let Json(payload) = payload?;
    payload.validate()?;
    let priority = payload.checked_priority()?;

    let job = jobs.submit(kind, &payload.url, priority).await?;
    Ok((StatusCode::ACCEPTED, Json(JobResponseDto::from(&job))))
}
