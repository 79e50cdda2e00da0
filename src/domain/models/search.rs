// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::domain::models::job::DomainError;

/// 查询文本最大字符数
pub const MAX_QUERY_CHARS: usize = 500;

/// 每页最大结果数
pub const MAX_PAGE_SIZE: u32 = 100;

/// 搜索查询
///
/// 只能通过 [`SearchQuery::new`] 构造，构造成功即满足所有约束：
/// 去除首尾空白后文本非空且不超过500字符，`page >= 1`，`1 <= page_size <= 100`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    page: u32,
    page_size: u32,
}

impl SearchQuery {
    pub fn new(text: &str, page: u32, page_size: u32) -> Result<Self, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::Validation("Query cannot be empty".to_string()));
        }
        if text.chars().count() > MAX_QUERY_CHARS {
            return Err(DomainError::Validation(format!(
                "Query must be at most {} characters",
                MAX_QUERY_CHARS
            )));
        }
        if page < 1 {
            return Err(DomainError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(DomainError::Validation(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Self {
            text: text.to_string(),
            page,
            page_size,
        })
    }

    /// 去除首尾空白后的展示文本
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 规范化文本（小写），用于缓存键
    pub fn normalized_text(&self) -> String {
        normalize_query_text(&self.text)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// 索引查询偏移量 `(page - 1) * page_size`
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// 查询文本规范化：去除首尾空白并转为小写
pub fn normalize_query_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub url: String,
    pub title: String,
    /// 摘要文本
    pub snippet: String,
    pub domain: String,
    /// 页面抓取日期
    pub crawl_date: Option<String>,
    /// 相关性分数
    pub score: Option<f64>,
}

/// 搜索响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub results: Vec<SearchResultItem>,
    /// 本次请求耗时（毫秒）
    pub search_time_ms: f64,
    /// 是否命中缓存
    pub cached: bool,
}

/// 总页数，向上取整
pub fn total_pages(total_results: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_results.div_ceil(u64::from(page_size))
}
