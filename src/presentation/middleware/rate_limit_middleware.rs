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

use crate::domain::models::caller::CallerIdentity;
use crate::domain::services::rate_limiting_service::{AdmitResult, RateLimiter};
use crate::presentation::errors::AppError;
use crate::utils::errors::ServiceError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

/// 限流中间件
///
/// 必须位于认证中间件之后，按请求扩展中的调用方身份计数。
/// 放行的响应带有 `X-RateLimit-*` 头，超限返回429。
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<CallerIdentity>()
        .cloned()
        .ok_or_else(|| ServiceError::Internal("caller identity missing".to_string()))?;

    let decision = limiter
        .admit(&identity.name, identity.rate_limit)
        .await
        .map_err(ServiceError::from)?;

    if !decision.allowed {
        warn!(
            caller = %identity.name,
            limit = decision.limit,
            retry_after = decision.retry_after_seconds,
            "Rate limit exceeded"
        );
        return Err(ServiceError::RateLimitExceeded {
            limit: decision.limit,
            retry_after_seconds: decision.retry_after_seconds,
            reset_at: decision.reset_at,
        }
        .into());
    }

    let mut response = next.run(req).await;
    stamp_headers(response.headers_mut(), &decision);
    Ok(response)
}

fn stamp_headers(headers: &mut HeaderMap, decision: &AdmitResult) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_at.timestamp()),
    );
}
