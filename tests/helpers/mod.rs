// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use parking_lot::Mutex;
use searchrs::domain::models::job::{Job, JobTransition};
use searchrs::domain::repositories::counter_backend::CounterBackend;
use searchrs::domain::repositories::job_repository::{
    JobRepository, RepositoryError, UpdateOutcome,
};
use searchrs::domain::search::index::{IndexError, IndexHit, IndexPage, SearchIndex};
use searchrs::domain::services::job_service::{JobQueues, JobService};
use searchrs::domain::services::rate_limiting_service::RateLimiter;
use searchrs::domain::services::search_service::SearchService;
use searchrs::infrastructure::cache::cache_manager::{JobStatusCache, SearchCache};
use searchrs::infrastructure::cache::memory_backend::MemoryCounterBackend;
use searchrs::presentation::middleware::auth_middleware::{ApiKeyInfo, AuthState};
use searchrs::presentation::routes::{self, AppComponents};
use searchrs::queue::dispatch_queue::InMemoryDispatchQueue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const TEST_API_KEY: &str = "sk-test";
pub const TEST_KEY_NAME: &str = "test-team";

/// 进程内任务仓库，条件更新语义与数据库实现一致
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<Job, RepositoryError> {
        self.jobs.lock().insert(job.id, job.clone());
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.lock().get(&id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        transition: &JobTransition,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        match job.apply(transition) {
            Ok(()) => Ok(UpdateOutcome::Applied(job.clone())),
            Err(_) => Ok(UpdateOutcome::Conflict(job.state)),
        }
    }
}

/// 返回固定结果的搜索索引，记录被调用次数
pub struct StubIndex {
    total: u64,
    calls: AtomicUsize,
    failing: bool,
}

impl StubIndex {
    pub fn with_total(total: u64) -> Self {
        Self {
            total,
            calls: AtomicUsize::new(0),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            total: 0,
            calls: AtomicUsize::new(0),
            failing: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndex for StubIndex {
    async fn query(&self, text: &str, limit: u32, offset: u64) -> Result<IndexPage, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(IndexError::NetworkError("connection refused".to_string()));
        }

        let remaining = self.total.saturating_sub(offset);
        let count = remaining.min(u64::from(limit));
        let hits = (0..count)
            .map(|i| IndexHit {
                url: format!("https://example.com/{}/{}", text.replace(' ', "-"), offset + i),
                title: format!("{} #{}", text, offset + i),
                snippet_source: format!("About {}", text),
                domain: "example.com".to_string(),
                date: None,
                score: Some(1.0),
            })
            .collect();

        Ok(IndexPage {
            total: self.total,
            hits,
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub struct TestAppOptions {
    pub index: Arc<StubIndex>,
    pub key_limit: u32,
    pub anonymous_limit: u32,
    pub allow_anonymous: bool,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            index: Arc::new(StubIndex::with_total(247)),
            key_limit: 1000,
            anonymous_limit: 10,
            allow_anonymous: true,
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub jobs: Arc<JobService>,
    pub queue: Arc<InMemoryDispatchQueue>,
    pub index: Arc<StubIndex>,
    pub counters: Arc<MemoryCounterBackend>,
}

/// 使用进程内后端组装完整的HTTP应用
pub fn spawn_app(options: TestAppOptions) -> TestApp {
    let counters = Arc::new(MemoryCounterBackend::new());
    let backend: Arc<dyn CounterBackend> = counters.clone();
    let queue = Arc::new(InMemoryDispatchQueue::new());
    let timeout = Duration::from_secs(2);

    let search_cache = Arc::new(SearchCache::new(backend.clone(), Duration::from_secs(1800)));
    let search_service = Arc::new(SearchService::new(
        options.index.clone(),
        search_cache.clone(),
        timeout,
    ));
    let jobs = Arc::new(
        JobService::new(
            Arc::new(InMemoryJobRepository::default()),
            queue.clone(),
            JobQueues::default(),
            timeout,
        )
        .with_status_cache(Arc::new(JobStatusCache::new(
            backend.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(5),
        ))),
    );

    let mut keys = HashMap::new();
    keys.insert(
        TEST_API_KEY.to_string(),
        ApiKeyInfo {
            name: TEST_KEY_NAME.to_string(),
            rate_limit: options.key_limit,
        },
    );

    let app = routes::app(AppComponents {
        search_service,
        search_cache,
        job_service: jobs.clone(),
        rate_limiter: Some(Arc::new(RateLimiter::new(backend, Duration::from_secs(60)))),
        auth: AuthState {
            keys: Arc::new(keys),
            allow_anonymous: options.allow_anonymous,
            anonymous_limit: options.anonymous_limit,
        },
    });

    TestApp {
        server: TestServer::new(app).unwrap(),
        jobs,
        queue,
        index: options.index,
        counters,
    }
}
