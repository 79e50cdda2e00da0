// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::utils::errors::{Dependency, ServiceError};

/// 为外部调用加上超时
///
/// 超时视为依赖不可用；调用本身的错误通过 `Into<ServiceError>` 分类
pub async fn bounded<T, E, F>(dependency: Dependency, limit: Duration, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ServiceError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            warn!(
                dependency = %dependency,
                timeout_ms = limit.as_millis() as u64,
                "Dependency call timed out"
            );
            Err(ServiceError::unavailable(
                dependency,
                format!("timed out after {}ms", limit.as_millis()),
            ))
        }
    }
}
