// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::join_all;
use searchrs::domain::services::rate_limiting_service::RateLimiter;
use searchrs::infrastructure::cache::memory_backend::MemoryCounterBackend;
use std::sync::Arc;
use std::time::Duration;

fn limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(
        Arc::new(MemoryCounterBackend::new()),
        Duration::from_secs(60),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_exceed_limit() {
    let limiter = limiter();
    let limit = 25;

    let handles = (0..100).map(|_| {
        let limiter = limiter.clone();
        tokio::spawn(async move { limiter.admit("team-a", limit).await.unwrap() })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let allowed = results.iter().filter(|r| r.allowed).count();
    assert_eq!(allowed, limit as usize);
    assert!(results
        .iter()
        .filter(|r| !r.allowed)
        .all(|r| r.remaining == 0 && r.retry_after_seconds >= 1));
}

#[tokio::test(start_paused = true)]
async fn test_new_window_restores_budget() {
    let limiter = limiter();

    for _ in 0..3 {
        assert!(limiter.admit("team-a", 3).await.unwrap().allowed);
    }
    let rejected = limiter.admit("team-a", 3).await.unwrap();
    assert!(!rejected.allowed);
    assert_eq!(rejected.retry_after_seconds, 60);

    tokio::time::advance(Duration::from_secs(61)).await;

    let fresh = limiter.admit("team-a", 3).await.unwrap();
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_tracks_remaining_window() {
    let limiter = limiter();

    assert!(limiter.admit("team-a", 1).await.unwrap().allowed);
    tokio::time::advance(Duration::from_secs(45)).await;

    let rejected = limiter.admit("team-a", 1).await.unwrap();
    assert!(!rejected.allowed);
    assert_eq!(rejected.retry_after_seconds, 15);
}

#[tokio::test]
async fn test_identities_have_separate_budgets() {
    let limiter = limiter();

    assert!(limiter.admit("team-a", 1).await.unwrap().allowed);
    assert!(!limiter.admit("team-a", 1).await.unwrap().allowed);
    assert!(limiter.admit("team-b", 1).await.unwrap().allowed);

    limiter.reset("team-a").await.unwrap();
    assert!(limiter.admit("team-a", 1).await.unwrap().allowed);
}
