// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use searchrs::domain::models::job::JobKind;
use searchrs::queue::dispatch_queue::{DispatchMessage, DispatchQueue};
use searchrs::queue::postgres_queue::PostgresDispatchQueue;
use std::sync::Arc;
use uuid::Uuid;

fn message(url: &str, priority: u8) -> DispatchMessage {
    DispatchMessage {
        job_id: Uuid::new_v4(),
        url: url.to_string(),
        kind: JobKind::Crawl,
        priority,
        created_at: Utc::now(),
    }
}

async fn setup_queue() -> PostgresDispatchQueue {
    // SQLite 忽略 SKIP LOCKED，这里只验证排序和租约语义
    let db = Arc::new(Database::connect("sqlite::memory:").await.unwrap());
    Migrator::up(db.as_ref(), None).await.unwrap();
    PostgresDispatchQueue::new(db)
}

#[tokio::test]
async fn test_dequeue_orders_by_priority_then_arrival() {
    let queue = setup_queue().await;
    for (url, priority) in [("https://a", 1), ("https://b", 5), ("https://c", 5), ("https://d", 0)] {
        let msg = message(url, priority);
        assert!(queue.enqueue("crawl_queue", &msg, priority).await.unwrap());
    }
    assert_eq!(queue.depth("crawl_queue").await.unwrap(), 4);

    let mut order = Vec::new();
    while let Some(delivery) = queue.dequeue("crawl_queue").await.unwrap() {
        order.push(delivery.message.url.clone());
        queue.ack(&delivery).await.unwrap();
    }

    assert_eq!(order, vec!["https://b", "https://c", "https://a", "https://d"]);
    assert_eq!(queue.depth("crawl_queue").await.unwrap(), 0);
}

#[tokio::test]
async fn test_queues_are_isolated() {
    let queue = setup_queue().await;
    let msg = message("https://recrawl", 10);
    queue.enqueue("recrawl_queue", &msg, 10).await.unwrap();

    assert!(queue.dequeue("crawl_queue").await.unwrap().is_none());
    let got = queue.dequeue("recrawl_queue").await.unwrap().unwrap();
    assert_eq!(got.message.job_id, msg.job_id);
}

#[tokio::test]
async fn test_unacked_message_survives_and_requeues() {
    let queue = setup_queue().await;
    let first = message("https://first", 3);
    let second = message("https://second", 3);
    queue.enqueue("crawl_queue", &first, 3).await.unwrap();
    queue.enqueue("crawl_queue", &second, 3).await.unwrap();

    let delivery = queue.dequeue("crawl_queue").await.unwrap().unwrap();
    assert_eq!(delivery.message.job_id, first.job_id);
    assert_eq!(delivery.attempts, 1);
    assert_eq!(queue.depth("crawl_queue").await.unwrap(), 1);

    queue.nack(&delivery, true).await.unwrap();
    assert_eq!(queue.depth("crawl_queue").await.unwrap(), 2);

    let again = queue.dequeue("crawl_queue").await.unwrap().unwrap();
    assert_eq!(again.message.job_id, first.job_id);
    assert_eq!(again.attempts, 2);

    queue.ack(&again).await.unwrap();
    // 已确认的投递不能再确认
    assert!(queue.ack(&again).await.is_err());
    assert_eq!(queue.depth("crawl_queue").await.unwrap(), 1);
}

#[tokio::test]
async fn test_expired_lease_is_redelivered() {
    let queue = setup_queue()
        .await
        .with_visibility_timeout(Duration::milliseconds(-1));
    let msg = message("https://crashed", 0);
    queue.enqueue("crawl_queue", &msg, 0).await.unwrap();

    let abandoned = queue.dequeue("crawl_queue").await.unwrap().unwrap();
    let redelivered = queue.dequeue("crawl_queue").await.unwrap().unwrap();
    assert_eq!(redelivered.message.job_id, msg.job_id);
    assert_eq!(redelivered.attempts, 2);

    // 旧租约的确认不影响新租约
    assert!(queue.ack(&abandoned).await.is_err());
    queue.ack(&redelivered).await.unwrap();
    assert!(queue.dequeue("crawl_queue").await.unwrap().is_none());
}
