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

use crate::config::settings::{AuthSettings, RateLimitingSettings};
use crate::domain::models::caller::CallerIdentity;
use crate::presentation::errors::unauthorized;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// API密钥请求头
pub const API_KEY_HEADER: &str = "x-api-key";

/// 已配置密钥的元数据
#[derive(Debug, Clone)]
pub struct ApiKeyInfo {
    pub name: String,
    pub rate_limit: u32,
}

/// 认证状态
#[derive(Clone)]
pub struct AuthState {
    /// API密钥 -> 密钥元数据
    pub keys: Arc<HashMap<String, ApiKeyInfo>>,
    /// 是否允许匿名访问
    pub allow_anonymous: bool,
    /// 匿名调用方的每窗口上限
    pub anonymous_limit: u32,
}

impl AuthState {
    /// 根据配置构建认证状态，未单独配置上限的密钥使用默认上限
    pub fn from_settings(auth: &AuthSettings, rate_limiting: &RateLimitingSettings) -> Self {
        let keys = auth
            .api_keys
            .iter()
            .map(|k| {
                (
                    k.key.clone(),
                    ApiKeyInfo {
                        name: k.name.clone(),
                        rate_limit: k.rate_limit.unwrap_or(rate_limiting.default_rpm),
                    },
                )
            })
            .collect();

        Self {
            keys: Arc::new(keys),
            allow_anonymous: auth.allow_anonymous,
            anonymous_limit: auth.anonymous_rate_limit,
        }
    }

    /// 解析调用方身份
    ///
    /// * 已知密钥 -> 以密钥名称为限流标识
    /// * 未知密钥 -> `None`
    /// * 未携带密钥 -> 允许匿名时返回匿名身份
    pub fn resolve(&self, api_key: Option<&str>) -> Option<CallerIdentity> {
        match api_key {
            Some(key) => self
                .keys
                .get(key)
                .map(|info| CallerIdentity::authenticated(info.name.clone(), info.rate_limit)),
            None if self.allow_anonymous => Some(CallerIdentity::anonymous(self.anonymous_limit)),
            None => None,
        }
    }
}

/// 认证中间件
///
/// 读取 `X-API-Key` 请求头，把解析出的 [`CallerIdentity`] 放入请求扩展
///
/// # 返回值
///
/// * `Ok(Response)` - 认证成功的响应
/// * `Err(Response)` - 密钥无效或缺失时返回401
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match state.resolve(api_key.as_deref()) {
        Some(identity) => {
            debug!(caller = %identity.name, authenticated = identity.authenticated, "Caller resolved");
            req.extensions_mut().insert(identity);
            Ok(next.run(req).await)
        }
        None if api_key.is_some() => {
            warn!("Rejected request with unknown API key");
            Err(unauthorized("Invalid API key"))
        }
        None => Err(unauthorized("API key required")),
    }
}
