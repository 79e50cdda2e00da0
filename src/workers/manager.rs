// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::workers::worker::Worker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 为每个工作器启动一个轮询循环，队列为空或出错时等待 `poll_interval` 后重试
pub struct WorkerManager {
    poll_interval: Duration,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new(poll_interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            poll_interval,
            shutdown,
            handles: Vec::new(),
        }
    }

    /// 启动工作进程
    ///
    /// # 参数
    ///
    /// * `worker` - 共享的工作器实例
    /// * `count` - 要启动的并发循环数量
    pub fn start_workers(&mut self, worker: Arc<dyn Worker>, count: usize) {
        for _ in 0..count {
            let worker = worker.clone();
            let mut stop = self.shutdown.subscribe();
            let poll_interval = self.poll_interval;

            let handle = tokio::spawn(async move {
                info!(worker = worker.name(), "Worker started");
                while !*stop.borrow() {
                    let idle = match worker.run_once().await {
                        Ok(processed) => !processed,
                        Err(e) => {
                            error!(worker = worker.name(), error = %e, "Worker iteration failed");
                            true
                        }
                    };
                    if idle {
                        tokio::select! {
                            _ = tokio::time::sleep(poll_interval) => {}
                            _ = stop.changed() => {}
                        }
                    }
                }
                info!(worker = worker.name(), "Worker stopped");
            });
            self.handles.push(handle);
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// 通知所有工作进程停止，并等待正在处理的消息完成
    pub async fn shutdown(self) {
        info!("Shutting down workers...");
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task ended abnormally");
            }
        }
        info!("Workers shut down successfully");
    }
}
