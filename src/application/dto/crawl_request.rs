// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::errors::ServiceError;
use crate::utils::validators::validate_priority;

/// 抓取和重新抓取共用的提交请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CrawlRequestDto {
    #[validate(length(min = 1, max = 2048), url)]
    pub url: String,
    /// 0-10，缺省时使用任务类型的默认优先级
    pub priority: Option<i64>,
}

impl CrawlRequestDto {
    /// 校验后的优先级
    pub fn checked_priority(&self) -> Result<Option<u8>, ServiceError> {
        self.priority
            .map(validate_priority)
            .transpose()
            .map_err(ServiceError::from)
    }
}
