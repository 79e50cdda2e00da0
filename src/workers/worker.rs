// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use async_trait::async_trait;

/// Worker trait定义
///
/// 所有后台工作器都必须实现此trait，循环调度由 [`WorkerManager`](super::manager::WorkerManager) 负责
#[async_trait]
pub trait Worker: Send + Sync {
    /// 处理至多一条消息
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 处理了一条消息，应立即继续
    /// * `Ok(false)` - 队列为空，调度方应等待后再轮询
    async fn run_once(&self) -> Result<bool, WorkerError>;

    /// 获取工作器名称
    fn name(&self) -> &str;
}
