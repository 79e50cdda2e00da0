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

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::domain::models::job::MAX_PRIORITY;

/// URL最大长度
pub const MAX_URL_LENGTH: usize = 2048;

/// 验证错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// URL无效
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// 优先级超出范围
    #[error("Priority must be between 0 and {MAX_PRIORITY}, got {0}")]
    PriorityOutOfRange(i64),
    /// 任务ID格式错误
    #[error("Invalid job ID format: {0}")]
    InvalidJobId(String),
}

/// 验证待爬取的URL
///
/// # 参数
///
/// * `url` - URL字符串
///
/// # 返回值
///
/// * `Ok(Url)` - 解析后的URL
/// * `Err(ValidationError)` - 非 http/https 绝对地址、缺少主机或超过长度上限
pub fn validate_target_url(url: &str) -> Result<Url, ValidationError> {
    if url.len() > MAX_URL_LENGTH {
        return Err(ValidationError::InvalidUrl(format!(
            "URL exceeds {} characters",
            MAX_URL_LENGTH
        )));
    }

    let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    // Check scheme
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidUrl("missing host".to_string()));
    }

    Ok(parsed)
}

/// 验证优先级 (0-10)
pub fn validate_priority(priority: i64) -> Result<u8, ValidationError> {
    if (0..=i64::from(MAX_PRIORITY)).contains(&priority) {
        Ok(priority as u8)
    } else {
        Err(ValidationError::PriorityOutOfRange(priority))
    }
}

/// 解析任务ID
///
/// 只接受规范的连字符格式UUID，其它形式（无连字符、带花括号、URN）一律拒绝
pub fn parse_job_id(raw: &str) -> Result<Uuid, ValidationError> {
    if raw.len() != 36 {
        return Err(ValidationError::InvalidJobId(raw.to_string()));
    }
    Uuid::try_parse(raw).map_err(|_| ValidationError::InvalidJobId(raw.to_string()))
}
