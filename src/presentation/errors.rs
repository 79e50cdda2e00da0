// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::utils::errors::ServiceError;

/// 错误响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn service_response(err: &ServiceError) -> Response {
        match err {
            ServiceError::Validation(msg) => body(
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
            ),
            ServiceError::RateLimitExceeded {
                limit,
                retry_after_seconds,
                reset_at,
            } => {
                let mut response = body(
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limit_exceeded",
                    format!("Rate limit of {} requests per window exceeded", limit),
                    Some(format!("Retry after {} seconds", retry_after_seconds)),
                );
                let headers = response.headers_mut();
                insert_header(headers, "retry-after", retry_after_seconds.to_string());
                insert_header(headers, "x-ratelimit-limit", limit.to_string());
                insert_header(headers, "x-ratelimit-remaining", "0".to_string());
                insert_header(headers, "x-ratelimit-reset", reset_at.timestamp().to_string());
                response
            }
            ServiceError::DependencyUnavailable { dependency, detail } => {
                warn!(dependency = %dependency, detail = %detail, "Request failed on unavailable dependency");
                body(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    format!("Dependency {} is unavailable", dependency),
                    None,
                )
            }
            ServiceError::NotFound(what) => body(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{} not found", what),
                None,
            ),
            ServiceError::Internal(detail) => {
                error!(detail = %detail, "Internal error");
                internal()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<ServiceError>() {
            return Self::service_response(err);
        }

        if let Some(errors) = self.0.downcast_ref::<ValidationErrors>() {
            return body(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors.to_string()),
            );
        }

        if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            return body(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Malformed request body".to_string(),
                Some(rejection.body_text()),
            );
        }

        error!(error = %self.0, "Unhandled application error");
        internal()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn body(status: StatusCode, error: &str, message: String, detail: Option<String>) -> Response {
    let payload = ErrorResponse {
        error: error.to_string(),
        message,
        detail,
    };
    (status, Json(payload)).into_response()
}

/// 认证失败响应
pub fn unauthorized(message: &str) -> Response {
    body(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        message.to_string(),
        None,
    )
}

fn internal() -> Response {
    body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "An internal error occurred".to_string(),
        None,
    )
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: String) {
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
