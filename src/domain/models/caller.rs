// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 匿名调用方的限流标识
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

/// 调用方身份
///
/// 由认证中间件解析后放入请求扩展，限流中间件据此选择计数键和上限
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// 限流标识
    pub name: String,
    /// 每窗口请求数限制
    pub rate_limit: u32,
    /// 是否通过API密钥认证
    pub authenticated: bool,
}

impl CallerIdentity {
    pub fn authenticated(name: impl Into<String>, rate_limit: u32) -> Self {
        Self {
            name: name.into(),
            rate_limit,
            authenticated: true,
        }
    }

    pub fn anonymous(rate_limit: u32) -> Self {
        Self {
            name: ANONYMOUS_IDENTITY.to_string(),
            rate_limit,
            authenticated: false,
        }
    }
}
