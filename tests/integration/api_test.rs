// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{spawn_app, StubIndex, TestAppOptions, TEST_API_KEY};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use searchrs::domain::models::job::JobResult;
use searchrs::queue::dispatch_queue::DispatchQueue;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app(TestAppOptions {
        allow_anonymous: false,
        ..Default::default()
    });

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");

    let response = app
        .server
        .post("/v1/search")
        .json(&json!({ "query": "rust" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_api_key_is_rejected() {
    let app = spawn_app(TestAppOptions::default());

    let response = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", "sk-nope")
        .json(&json!({ "query": "rust" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_search_paginates_and_caches() {
    let app = spawn_app(TestAppOptions::default());

    // Given: 索引中有247条匹配文档
    let response = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "python tutorial", "page": 1, "page_size": 10 }))
        .await;

    // Then: 第一次查询未命中缓存
    assert_eq!(response.status_code(), StatusCode::OK);
    let first: Value = response.json();
    assert_eq!(first["total_results"], 247);
    assert_eq!(first["total_pages"], 25);
    assert_eq!(first["results"].as_array().unwrap().len(), 10);
    assert_eq!(first["cached"], false);

    // When: 相同查询再次请求
    let response = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "Python Tutorial ", "page": 1, "page_size": 10 }))
        .await;

    // Then: 命中缓存且不再访问索引
    let second: Value = response.json();
    assert_eq!(second["cached"], true);
    assert_eq!(second["query"], "Python Tutorial");
    assert_eq!(second["results"], first["results"]);
    assert_eq!(app.index.calls(), 1);
}

#[tokio::test]
async fn test_page_size_bounds() {
    let app = spawn_app(TestAppOptions::default());

    let response = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "rust", "page_size": 100 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["results"].as_array().unwrap().len(), 100);

    let response = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "rust", "page_size": 101 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let app = spawn_app(TestAppOptions::default());

    let response = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "   " }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(app.index.calls(), 0);
}

#[tokio::test]
async fn test_index_outage_is_service_unavailable() {
    let app = spawn_app(TestAppOptions {
        index: Arc::new(StubIndex::failing()),
        ..Default::default()
    });

    let response = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "rust" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_rate_limit_rejects_after_limit() {
    let app = spawn_app(TestAppOptions {
        key_limit: 3,
        ..Default::default()
    });

    for expected_remaining in ["2", "1", "0"] {
        let response = app
            .server
            .post("/v1/search")
            .add_header("X-API-Key", TEST_API_KEY)
            .json(&json!({ "query": "rust" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("x-ratelimit-limit"), "3");
        assert_eq!(response.header("x-ratelimit-remaining"), expected_remaining);
    }

    let response = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "rust" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .header("retry-after")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = response.json();
    assert_eq!(body["error"], "rate_limit_exceeded");
}

#[tokio::test]
async fn test_anonymous_callers_share_a_smaller_budget() {
    let app = spawn_app(TestAppOptions {
        anonymous_limit: 1,
        ..Default::default()
    });

    let first = app.server.post("/v1/search").json(&json!({ "query": "rust" })).await;
    assert_eq!(first.status_code(), StatusCode::OK);

    let second = app.server.post("/v1/search").json(&json!({ "query": "rust" })).await;
    assert_eq!(second.status_code(), StatusCode::TOO_MANY_REQUESTS);

    // 使用密钥的调用方不受匿名额度影响
    let keyed = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "rust" }))
        .await;
    assert_eq!(keyed.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_recrawl_lifecycle() {
    let app = spawn_app(TestAppOptions::default());

    // When: 提交重新抓取任务
    let response = app
        .server
        .post("/v1/crawl/recrawl")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "url": "https://example.com/page" }))
        .await;

    // Then: 202 并带有1小时的截止时间
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let created: Value = response.json();
    assert_eq!(created["status"], "pending");
    let created_at: DateTime<Utc> = serde_json::from_value(created["created_at"].clone()).unwrap();
    let deadline: DateTime<Utc> = serde_json::from_value(created["sla_deadline"].clone()).unwrap();
    assert_eq!(deadline - created_at, chrono::Duration::hours(1));

    // 以最高优先级进入重新抓取队列
    assert_eq!(app.queue.depth("recrawl_queue").await.unwrap(), 1);
    let delivery = app.queue.dequeue("recrawl_queue").await.unwrap().unwrap();
    assert_eq!(delivery.message.priority, 10);

    let job_id = created["job_id"].as_str().unwrap().to_string();
    let status: Value = app
        .server
        .get(&format!("/v1/jobs/{}", job_id))
        .add_header("X-API-Key", TEST_API_KEY)
        .await
        .json();
    assert_eq!(status["status"], "pending");
    assert_eq!(status["job_type"], "recrawl");
    assert_eq!(status["priority"], 10);

    // When: 工作器推进任务
    let id = Uuid::parse_str(&job_id).unwrap();
    app.jobs.mark_started(id).await.unwrap();
    app.jobs
        .mark_completed(
            id,
            JobResult {
                pages_crawled: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Then: 状态查询看到最新状态而不是缓存中的旧值
    let status: Value = app
        .server
        .get(&format!("/v1/jobs/{}", job_id))
        .add_header("X-API-Key", TEST_API_KEY)
        .await
        .json();
    assert_eq!(status["status"], "completed");
    assert_eq!(status["result"]["pages_crawled"], 1);
    assert!(status["started_at"].is_string());
    assert!(status["completed_at"].is_string());
    assert!(status["error"].is_null());
}

#[tokio::test]
async fn test_crawl_defaults_and_validation() {
    let app = spawn_app(TestAppOptions::default());

    let response = app
        .server
        .post("/v1/crawl")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "url": "https://example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let created: Value = response.json();
    assert!(created["sla_deadline"].is_null());
    assert_eq!(app.queue.depth("crawl_queue").await.unwrap(), 1);

    let response = app
        .server
        .post("/v1/crawl")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "url": "https://example.com", "priority": 11 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/v1/crawl")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "url": "ftp://example.com/file" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    // 校验失败的请求不会入队
    assert_eq!(app.queue.depth("crawl_queue").await.unwrap(), 1);
}

#[tokio::test]
async fn test_job_lookup_errors() {
    let app = spawn_app(TestAppOptions::default());

    let response = app
        .server
        .get("/v1/jobs/not-a-uuid")
        .add_header("X-API-Key", TEST_API_KEY)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .get(&format!("/v1/jobs/{}", Uuid::new_v4()))
        .add_header("X-API-Key", TEST_API_KEY)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_purge_cache_for_one_query() {
    let app = spawn_app(TestAppOptions::default());

    for page in [1, 2] {
        app.server
            .post("/v1/search")
            .add_header("X-API-Key", TEST_API_KEY)
            .json(&json!({ "query": "rust", "page": page }))
            .await;
    }
    app.server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "python" }))
        .await;
    assert_eq!(app.index.calls(), 3);

    let response = app
        .server
        .delete("/v1/search/cache")
        .add_query_param("query", "Rust")
        .add_header("X-API-Key", TEST_API_KEY)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["purged"], 2);

    // "python" 仍在缓存中
    let python: Value = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "python" }))
        .await
        .json();
    assert_eq!(python["cached"], true);

    let rust: Value = app
        .server
        .post("/v1/search")
        .add_header("X-API-Key", TEST_API_KEY)
        .json(&json!({ "query": "rust" }))
        .await
        .json();
    assert_eq!(rust["cached"], false);
}
