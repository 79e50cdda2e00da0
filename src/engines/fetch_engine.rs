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

use crate::domain::models::job::JobResult;
use crate::engines::traits::{CrawlExecutor, FetchError};
use crate::queue::dispatch_queue::DispatchMessage;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tracing::debug;

/// 抓取使用的 User-Agent
pub const USER_AGENT: &str = "SearchEngineBot/1.0";

/// HTTP抓取引擎
///
/// 基于reqwest实现的基本抓取：下载目标页面，记录状态码、正文长度和正文摘要哈希。
/// 解析和建立索引不在这里完成。
pub struct HttpFetchEngine {
    client: reqwest::Client,
}

impl HttpFetchEngine {
    /// 创建抓取引擎
    ///
    /// # 参数
    ///
    /// * `timeout` - 单次请求超时时间
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CrawlExecutor for HttpFetchEngine {
    /// 执行HTTP抓取
    ///
    /// # 返回值
    ///
    /// * `Ok(JobResult)` - 2xx 响应的抓取结果
    /// * `Err(FetchError)` - 网络错误或非成功状态码
    async fn execute(&self, message: &DispatchMessage) -> Result<JobResult, FetchError> {
        let start = Instant::now();
        let response = self.client.get(&message.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        let content_hash = hex::encode(Sha256::digest(&body));

        debug!(
            job_id = %message.job_id,
            url = %message.url,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched target"
        );

        Ok(JobResult {
            pages_crawled: 1,
            documents_indexed: None,
            status_code: Some(status.as_u16()),
            content_length: Some(body.len() as u64),
            content_hash: Some(content_hash),
        })
    }

    fn name(&self) -> &'static str {
        "http_fetch"
    }
}
