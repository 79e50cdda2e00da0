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

use searchrs::config::settings::{QueueBackend, Settings};
use searchrs::domain::repositories::counter_backend::CounterBackend;
use searchrs::domain::services::job_service::{JobQueues, JobService};
use searchrs::domain::services::rate_limiting_service::RateLimiter;
use searchrs::domain::services::search_service::SearchService;
use searchrs::engines::fetch_engine::HttpFetchEngine;
use searchrs::infrastructure::cache::cache_manager::{JobStatusCache, SearchCache};
use searchrs::infrastructure::cache::memory_backend::MemoryCounterBackend;
use searchrs::infrastructure::cache::redis_client::RedisClient;
use searchrs::infrastructure::database::connection;
use searchrs::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
use searchrs::infrastructure::search::ElasticsearchIndex;
use searchrs::presentation::middleware::auth_middleware::AuthState;
use searchrs::presentation::routes::{self, AppComponents};
use searchrs::queue::dispatch_queue::{DispatchQueue, InMemoryDispatchQueue};
use searchrs::queue::postgres_queue::PostgresDispatchQueue;
use searchrs::workers::crawl_worker::CrawlWorker;
use searchrs::workers::manager::WorkerManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use searchrs::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Arc::new(Settings::new()?);

    // 2. Initialize logging
    telemetry::init_telemetry(settings.logging.format);
    info!("Starting searchrs...");

    if settings.metrics.enabled {
        searchrs::infrastructure::metrics::init_metrics(&settings.metrics.address);
    }

    let timeout = settings.dependencies.timeout();

    // 3. Connect to database
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    connection::run_migrations(db.as_ref()).await?;
    info!("Database connection established");

    // 4. Counter backend shared by rate limiting and caches
    let counters: Arc<dyn CounterBackend> = if settings.redis.enabled {
        let redis = RedisClient::new(&settings.redis.url)?;
        if let Err(e) = redis.ping().await {
            warn!("Redis not reachable at startup: {}", e);
        }
        info!("Redis counter backend initialized");
        Arc::new(redis)
    } else {
        warn!("Redis disabled, using in-process counters");
        Arc::new(MemoryCounterBackend::new())
    };

    // 5. Dispatch queue
    let queue: Arc<dyn DispatchQueue> = match settings.queue.backend {
        QueueBackend::Postgres => Arc::new(
            PostgresDispatchQueue::new(db.clone()).with_visibility_timeout(chrono::Duration::seconds(
                settings.queue.visibility_timeout_seconds,
            )),
        ),
        QueueBackend::Memory => Arc::new(InMemoryDispatchQueue::new()),
    };

    // 6. Services
    let search_cache = Arc::new(
        SearchCache::new(
            counters.clone(),
            Duration::from_secs(settings.cache.search_ttl_seconds),
        )
        .with_timeout(timeout),
    );
    let status_cache = Arc::new(
        JobStatusCache::new(
            counters.clone(),
            Duration::from_secs(settings.cache.job_status_ttl_seconds),
            Duration::from_secs(settings.cache.job_status_pending_ttl_seconds),
        )
        .with_timeout(timeout),
    );

    let mut index = ElasticsearchIndex::new(
        &settings.search_index.url,
        &settings.search_index.index,
        timeout,
    )?;
    if let (Some(username), Some(password)) = (
        settings.search_index.username.clone(),
        settings.search_index.password.clone(),
    ) {
        index = index.with_credentials(username, password);
    }
    let search_service = Arc::new(SearchService::new(
        Arc::new(index),
        search_cache.clone(),
        timeout,
    ));

    let queues = JobQueues {
        crawl: settings.queue.crawl_queue.clone(),
        recrawl: settings.queue.recrawl_queue.clone(),
    };
    let job_service = Arc::new(
        JobService::new(
            Arc::new(JobRepositoryImpl::new(db.clone())),
            queue.clone(),
            queues,
            timeout,
        )
        .with_status_cache(status_cache),
    );

    let rate_limiter = settings.rate_limiting.enabled.then(|| {
        Arc::new(
            RateLimiter::new(counters.clone(), settings.rate_limiting.window()).with_timeout(timeout),
        )
    });

    // 7. Start Workers
    let mut worker_manager =
        WorkerManager::new(Duration::from_millis(settings.workers.poll_interval_ms));
    if settings.workers.enabled {
        let executor = Arc::new(HttpFetchEngine::new(Duration::from_secs(
            settings.workers.fetch_timeout_seconds,
        ))?);
        let worker = Arc::new(
            CrawlWorker::new(job_service.clone(), queue.clone(), executor)
                .with_max_attempts(settings.workers.max_attempts),
        );
        worker_manager.start_workers(worker, settings.workers.count);
        info!("Started {} crawl workers", worker_manager.worker_count());
    }

    // 8. Start HTTP server
    let app = routes::app(AppComponents {
        search_service,
        search_cache,
        job_service,
        rate_limiter,
        auth: AuthState::from_settings(&settings.auth, &settings.rate_limiting),
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker_manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }
}
