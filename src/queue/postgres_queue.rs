// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::database::entities::dispatch_message;
use crate::queue::dispatch_queue::{Delivery, DispatchMessage, DispatchQueue, QueueError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{
    sea_query::{Condition, Expr, LockBehavior, LockType},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// 默认租约时长（秒）
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: i64 = 300;

/// PostgreSQL分发队列实现
///
/// 消息存放在 `dispatch_messages` 表中，出队时按优先级降序、序号升序取一条可见消息，
/// 使用 `FOR UPDATE SKIP LOCKED` 让多个工作器并发出队互不阻塞。
/// 出队只写入租约期限，消息在 `ack` 时才删除；
/// 消费者崩溃未确认时，租约到期后消息重新可见。
pub struct PostgresDispatchQueue {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
    visibility_timeout: Duration,
}

impl PostgresDispatchQueue {
    /// 创建新的PostgreSQL分发队列实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            visibility_timeout: Duration::seconds(DEFAULT_VISIBILITY_TIMEOUT_SECS),
        }
    }

    /// 设置租约时长
    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    /// 未租用或租约已过期
    fn visible() -> Condition {
        Condition::any()
            .add(dispatch_message::Column::LeasedUntil.is_null())
            .add(dispatch_message::Column::LeasedUntil.lt(Utc::now().fixed_offset()))
    }

    /// 只匹配本次租约，过期后被他人重新租用的消息不受影响
    fn leased_by(delivery: &Delivery) -> Result<Condition, QueueError> {
        let seq = i32::try_from(delivery.id).map_err(|_| QueueError::UnknownDelivery(delivery.id))?;
        let attempts =
            i32::try_from(delivery.attempts).map_err(|_| QueueError::UnknownDelivery(delivery.id))?;
        Ok(Condition::all()
            .add(dispatch_message::Column::Seq.eq(seq))
            .add(dispatch_message::Column::Attempts.eq(attempts))
            .add(dispatch_message::Column::LeasedUntil.is_not_null()))
    }
}

#[async_trait]
impl DispatchQueue for PostgresDispatchQueue {
    async fn enqueue(
        &self,
        queue_name: &str,
        message: &DispatchMessage,
        priority: u8,
    ) -> Result<bool, QueueError> {
        let model = dispatch_message::ActiveModel {
            queue_name: Set(queue_name.to_string()),
            job_id: Set(message.job_id),
            payload: Set(serde_json::to_value(message)?),
            priority: Set(i32::from(priority)),
            enqueued_at: Set(Utc::now().fixed_offset()),
            attempts: Set(0),
            leased_until: Set(None),
            ..Default::default()
        };

        model.insert(self.db.as_ref()).await?;
        debug!(queue = %queue_name, job_id = %message.job_id, priority, "Message enqueued");
        Ok(true)
    }

    async fn dequeue(&self, queue_name: &str) -> Result<Option<Delivery>, QueueError> {
        let txn = self.db.begin().await?;

        let row = dispatch_message::Entity::find()
            .filter(dispatch_message::Column::QueueName.eq(queue_name))
            .filter(Self::visible())
            .order_by_desc(dispatch_message::Column::Priority)
            .order_by_asc(dispatch_message::Column::Seq)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        let Some(row) = row else {
            txn.commit().await?;
            return Ok(None);
        };

        if row.leased_until.is_some() {
            warn!(queue = %queue_name, job_id = %row.job_id, attempts = row.attempts, "Lease expired, redelivering message");
        }

        let seq = row.seq;
        let attempts = row.attempts + 1;
        let payload = row.payload.clone();
        let mut model: dispatch_message::ActiveModel = row.into();
        model.attempts = Set(attempts);
        model.leased_until = Set(Some((Utc::now() + self.visibility_timeout).fixed_offset()));
        model.update(&txn).await?;
        txn.commit().await?;

        let message: DispatchMessage = serde_json::from_value(payload)?;
        Ok(Some(Delivery {
            id: i64::from(seq),
            queue_name: queue_name.to_string(),
            attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
            message,
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let result = dispatch_message::Entity::delete_many()
            .filter(Self::leased_by(delivery)?)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(QueueError::UnknownDelivery(delivery.id));
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError> {
        if !requeue {
            return self.ack(delivery).await;
        }

        let result = dispatch_message::Entity::update_many()
            .col_expr(
                dispatch_message::Column::LeasedUntil,
                Expr::value(Option::<chrono::DateTime<chrono::FixedOffset>>::None),
            )
            .filter(Self::leased_by(delivery)?)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(QueueError::UnknownDelivery(delivery.id));
        }
        debug!(queue = %delivery.queue_name, job_id = %delivery.message.job_id, attempts = delivery.attempts, "Message requeued");
        Ok(())
    }

    async fn depth(&self, queue_name: &str) -> Result<u64, QueueError> {
        let count = dispatch_message::Entity::find()
            .filter(dispatch_message::Column::QueueName.eq(queue_name))
            .filter(Self::visible())
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }
}
