// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{Job, JobKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;
use uuid::Uuid;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// 消息编解码错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 投递不存在或已被确认
    #[error("Unknown delivery {0}")]
    UnknownDelivery(i64),
}

/// 分发消息
///
/// 工作器据此找到并执行任务，任务本身以任务存储为准
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMessage {
    pub job_id: Uuid,
    pub url: String,
    pub kind: JobKind,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for DispatchMessage {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            url: job.target_url.clone(),
            kind: job.kind,
            priority: job.kind.dispatch_priority(job.priority),
            created_at: job.created_at,
        }
    }
}

/// 一次投递
///
/// 出队的消息在确认之前处于租约中，不会再被其他消费者取到。
/// `attempts` 从1开始计数，大于1表示这是重新投递。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// 投递标识，确认和退回时使用
    pub id: i64,
    pub queue_name: String,
    pub attempts: u32,
    pub message: DispatchMessage,
}

impl Delivery {
    pub fn is_redelivery(&self) -> bool {
        self.attempts > 1
    }
}

/// 分发队列特质
///
/// 同一队列内按优先级从高到低出队，优先级相同时先进先出。
/// 出队只是租用消息，消费者处理完成后 `ack` 删除消息，
/// 处理失败时 `nack` 退回队列或丢弃。
#[async_trait]
pub trait DispatchQueue: Send + Sync {
    /// 入队消息，返回 `false` 表示队列拒绝接收
    async fn enqueue(
        &self,
        queue_name: &str,
        message: &DispatchMessage,
        priority: u8,
    ) -> Result<bool, QueueError>;

    /// 租用下一条消息
    async fn dequeue(&self, queue_name: &str) -> Result<Option<Delivery>, QueueError>;

    /// 确认投递，消息被删除
    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// 拒绝投递，`requeue` 为真时消息回到队列中原来的位置
    async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError>;

    /// 等待投递的消息数，不含租约中的消息
    async fn depth(&self, queue_name: &str) -> Result<u64, QueueError>;
}

#[derive(Debug, Clone)]
struct QueuedMessage {
    priority: u8,
    seq: i64,
    attempts: u32,
    message: DispatchMessage,
}

impl QueuedMessage {
    fn rank(&self) -> (u8, Reverse<i64>) {
        (self.priority, Reverse(self.seq))
    }
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for QueuedMessage {}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[derive(Default)]
struct QueueState {
    queues: HashMap<String, BinaryHeap<QueuedMessage>>,
    /// 租约中的消息，按投递标识索引
    in_flight: HashMap<i64, (String, QueuedMessage)>,
    next_seq: i64,
}

/// 进程内分发队列
///
/// 单实例部署和测试使用，进程退出后消息丢失，租约没有超时
#[derive(Default)]
pub struct InMemoryDispatchQueue {
    state: Mutex<QueueState>,
    /// 单个队列的容量上限
    capacity: Option<usize>,
}

impl InMemoryDispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带容量上限的队列，队列满时 `enqueue` 返回 `false`
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity: Some(capacity),
        }
    }

    /// 租约中的消息数
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}

#[async_trait]
impl DispatchQueue for InMemoryDispatchQueue {
    async fn enqueue(
        &self,
        queue_name: &str,
        message: &DispatchMessage,
        priority: u8,
    ) -> Result<bool, QueueError> {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        let heap = state.queues.entry(queue_name.to_string()).or_default();

        if self.capacity.is_some_and(|capacity| heap.len() >= capacity) {
            return Ok(false);
        }

        heap.push(QueuedMessage {
            priority,
            seq,
            attempts: 0,
            message: message.clone(),
        });
        state.next_seq += 1;
        Ok(true)
    }

    async fn dequeue(&self, queue_name: &str) -> Result<Option<Delivery>, QueueError> {
        let mut state = self.state.lock();
        let Some(mut queued) = state.queues.get_mut(queue_name).and_then(BinaryHeap::pop) else {
            return Ok(None);
        };

        queued.attempts += 1;
        let delivery = Delivery {
            id: queued.seq,
            queue_name: queue_name.to_string(),
            attempts: queued.attempts,
            message: queued.message.clone(),
        };
        state
            .in_flight
            .insert(queued.seq, (queue_name.to_string(), queued));
        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        state
            .in_flight
            .remove(&delivery.id)
            .map(|_| ())
            .ok_or(QueueError::UnknownDelivery(delivery.id))
    }

    async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        let (queue_name, queued) = state
            .in_flight
            .remove(&delivery.id)
            .ok_or(QueueError::UnknownDelivery(delivery.id))?;

        if requeue {
            // 保留原序号，退回的消息排在同优先级后来者之前
            state.queues.entry(queue_name).or_default().push(queued);
        }
        Ok(())
    }

    async fn depth(&self, queue_name: &str) -> Result<u64, QueueError> {
        let state = self.state.lock();
        Ok(state
            .queues
            .get(queue_name)
            .map_or(0, |heap| heap.len() as u64))
    }
}
