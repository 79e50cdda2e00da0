// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum IndexError {
    #[error("Search index error (status {status}): {message}")]
    EngineError { status: u16, message: String },
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Malformed index response: {0}")]
    DecodeError(String),
}

/// 索引命中的单个文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub url: String,
    pub title: String,
    /// 用于生成摘要的文本（高亮片段或正文）
    pub snippet_source: String,
    pub domain: String,
    pub date: Option<String>,
    pub score: Option<f64>,
}

/// 一页索引查询结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexPage {
    /// 匹配文档总数
    pub total: u64,
    pub hits: Vec<IndexHit>,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Run a full-text query, returning at most `limit` hits starting at `offset`
    async fn query(&self, text: &str, limit: u32, offset: u64) -> Result<IndexPage, IndexError>;

    /// Get the name of the index backend
    fn name(&self) -> &'static str;
}
