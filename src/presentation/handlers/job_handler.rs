// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path},
    Json,
};
use std::sync::Arc;

use crate::{
    application::dto::job_response::JobStatusResponseDto,
    domain::services::job_service::JobService,
    presentation::errors::AppError,
    utils::{errors::ServiceError, validators::parse_job_id},
};

/// 查询任务状态
///
/// 非法的任务ID返回400，不存在的任务返回404
pub async fn get_job_status(
    Extension(jobs): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponseDto>, AppError> {
    let id = parse_job_id(&id).map_err(ServiceError::from)?;

    let job = jobs
        .get_status(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("job {}", id)))?;

    Ok(Json(JobStatusResponseDto::from(job)))
}
