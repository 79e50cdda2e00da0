// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use searchrs::domain::models::job::{Job, JobKind, JobResult, JobTransition};
use searchrs::domain::models::search::SearchQuery;
use searchrs::domain::repositories::counter_backend::CounterBackend;
use searchrs::infrastructure::cache::cache_manager::{JobStatusCache, SearchCache};
use searchrs::infrastructure::cache::memory_backend::MemoryCounterBackend;
use std::sync::Arc;
use std::time::Duration;

fn cache() -> (Arc<MemoryCounterBackend>, SearchCache) {
    let backend = Arc::new(MemoryCounterBackend::new());
    let cache = SearchCache::new(backend.clone(), Duration::from_secs(1800));
    (backend, cache)
}

#[tokio::test]
async fn test_store_then_lookup() {
    let (_, cache) = cache();
    let key = SearchCache::key_for(&SearchQuery::new("rust", 1, 10).unwrap());

    assert!(cache.lookup::<Vec<String>>(&key).await.unwrap().is_none());
    cache
        .store(&key, &vec!["a".to_string(), "b".to_string()], None)
        .await
        .unwrap();

    let entry = cache.lookup::<Vec<String>>(&key).await.unwrap().unwrap();
    assert_eq!(entry.payload, vec!["a", "b"]);
    assert!(entry.stored_at <= Utc::now());
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_after_ttl() {
    let (_, cache) = cache();
    let key = SearchCache::key_for(&SearchQuery::new("rust", 1, 10).unwrap());
    cache
        .store(&key, &1u32, Some(Duration::from_secs(30)))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(cache.lookup::<u32>(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreadable_entry_is_a_miss() {
    let (backend, cache) = cache();
    backend
        .set_with_expiry("search:broken", "{not json", Duration::from_secs(60))
        .await
        .unwrap();

    assert!(cache.lookup::<u32>("search:broken").await.unwrap().is_none());
    assert!(backend.get("search:broken").await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalidate_query_escapes_glob_characters() {
    let (backend, cache) = cache();
    for text in ["c++ [draft]", "c++ draft", "rust"] {
        let key = SearchCache::key_for(&SearchQuery::new(text, 1, 10).unwrap());
        cache.store(&key, &0u32, None).await.unwrap();
    }

    assert_eq!(cache.invalidate_query("C++ [draft]").await.unwrap(), 1);
    assert!(backend.get("search:c++ draft:p1:s10").await.unwrap().is_some());

    // 清空全部搜索缓存不影响其他前缀
    backend
        .set_with_expiry("rate_limit:team-a", "3", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(cache.clear_all().await.unwrap(), 2);
    assert!(backend.get("rate_limit:team-a").await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_job_status_ttl_depends_on_state() {
    let backend = Arc::new(MemoryCounterBackend::new());
    let cache = JobStatusCache::new(
        backend.clone(),
        Duration::from_secs(3600),
        Duration::from_secs(5),
    );

    let pending = Job::new(JobKind::Crawl, "https://example.com/a", 0, Utc::now());
    let mut finished = Job::new(JobKind::Recrawl, "https://example.com/b", 10, Utc::now());
    finished
        .apply(&JobTransition::Complete {
            completed_at: Utc::now(),
            result: JobResult {
                pages_crawled: 1,
                ..Default::default()
            },
        })
        .unwrap();

    cache.put(&pending).await.unwrap();
    cache.put(&finished).await.unwrap();
    tokio::time::advance(Duration::from_secs(10)).await;

    assert!(cache.get(pending.id).await.unwrap().is_none());
    assert_eq!(cache.get(finished.id).await.unwrap(), Some(finished.clone()));

    cache.evict(finished.id).await.unwrap();
    assert!(cache.get(finished.id).await.unwrap().is_none());
}
