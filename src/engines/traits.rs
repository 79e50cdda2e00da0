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

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::job::JobResult;
use crate::queue::dispatch_queue::DispatchMessage;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 目标返回非成功状态码
    #[error("Target responded with HTTP {0}")]
    HttpStatus(u16),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl FetchError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            FetchError::HttpStatus(status) => *status >= 500 || *status == 429,
            FetchError::Other(_) => false,
        }
    }
}

/// 任务执行器特质
///
/// 工作器取出分发消息后交给执行器完成实际抓取，执行器只负责产出结果，
/// 任务状态的推进由任务服务完成
#[async_trait]
pub trait CrawlExecutor: Send + Sync {
    /// 执行一条分发消息
    async fn execute(&self, message: &DispatchMessage) -> Result<JobResult, FetchError>;

    /// 执行器名称
    fn name(&self) -> &'static str;
}
