// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::search::index::{IndexError, IndexHit, IndexPage, SearchIndex};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// 未命中高亮时正文摘要的最大字符数
const SNIPPET_CHARS: usize = 200;

/// Elasticsearch 全文索引适配器
///
/// 在 `title^3`、`content`、`url` 上做 `multi_match` 查询，
/// 摘要优先使用正文高亮片段，否则截取正文开头
pub struct ElasticsearchIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    credentials: Option<(String, String)>,
}

impl ElasticsearchIndex {
    pub fn new(base_url: &str, index: &str, timeout: Duration) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| IndexError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            credentials: None,
        })
    }

    /// 使用 Basic 认证
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.credentials = Some((username, password));
        self
    }

    fn query_body(text: &str, limit: u32, offset: u64) -> Value {
        json!({
            "from": offset,
            "size": limit,
            "query": {
                "multi_match": {
                    "query": text,
                    "fields": ["title^3", "content", "url"],
                    "type": "best_fields",
                    "fuzziness": "AUTO"
                }
            },
            "highlight": {
                "fields": {
                    "content": { "fragment_size": 150, "number_of_fragments": 3 }
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// ES 7+ 返回 `{"value": n}`，更早的版本返回数字
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: DocumentSource,
    #[serde(default)]
    highlight: HashMap<String, Vec<String>>,
}

/// 文档缺少标题时展示的占位文本
const UNTITLED: &str = "No title";

fn untitled() -> String {
    UNTITLED.to_string()
}

#[derive(Debug, Deserialize)]
struct DocumentSource {
    #[serde(default)]
    url: String,
    #[serde(default = "untitled")]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    domain: String,
    crawl_date: Option<String>,
}

impl Default for DocumentSource {
    fn default() -> Self {
        Self {
            url: String::new(),
            title: untitled(),
            content: String::new(),
            domain: String::new(),
            crawl_date: None,
        }
    }
}

/// 生成摘要：高亮片段用 `" ... "` 连接，没有高亮时截取正文前200字符
fn build_snippet(highlight: &HashMap<String, Vec<String>>, content: &str) -> String {
    if let Some(fragments) = highlight.get("content").filter(|f| !f.is_empty()) {
        return fragments.join(" ... ");
    }

    if content.chars().count() > SNIPPET_CHARS {
        let truncated: String = content.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", truncated)
    } else {
        content.to_string()
    }
}

impl From<RawHit> for IndexHit {
    fn from(hit: RawHit) -> Self {
        let snippet_source = build_snippet(&hit.highlight, &hit.source.content);
        Self {
            url: hit.source.url,
            title: hit.source.title,
            snippet_source,
            domain: hit.source.domain,
            date: hit.source.crawl_date,
            score: hit.score,
        }
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn query(&self, text: &str, limit: u32, offset: u64) -> Result<IndexPage, IndexError> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let mut request = self
            .client
            .post(&url)
            .json(&Self::query_body(text, limit, offset));
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| IndexError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexError::EngineError {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponseBody = response
            .json()
            .await
            .map_err(|e| IndexError::DecodeError(e.to_string()))?;

        let total = match body.hits.total {
            Some(TotalHits::Object { value }) | Some(TotalHits::Count(value)) => value,
            None => body.hits.hits.len() as u64,
        };
        let hits: Vec<IndexHit> = body.hits.hits.into_iter().map(IndexHit::from).collect();
        debug!(index = %self.index, total, returned = hits.len(), "Index query completed");

        Ok(IndexPage { total, hits })
    }

    fn name(&self) -> &'static str {
        "elasticsearch"
    }
}
