// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::search::SearchQuery;
use crate::utils::errors::ServiceError;

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SearchRequestDto {
    #[validate(length(min = 1, message = "Query cannot be empty"))]
    pub query: String,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "page_size must be between 1 and 100"))]
    pub page_size: u32,
}

impl SearchRequestDto {
    /// 转换为领域查询，空白查询和超长查询在这里被拒绝
    pub fn into_query(self) -> Result<SearchQuery, ServiceError> {
        Ok(SearchQuery::new(&self.query, self.page, self.page_size)?)
    }
}

/// 缓存清理请求，`query` 为空时清空全部搜索缓存
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PurgeCacheRequestDto {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PurgeCacheResponseDto {
    /// 删除的缓存条目数
    pub purged: u64,
}
