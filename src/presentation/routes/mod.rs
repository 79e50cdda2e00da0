// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::job_service::JobService;
use crate::domain::services::rate_limiting_service::RateLimiter;
use crate::domain::services::search_service::SearchService;
use crate::infrastructure::cache::cache_manager::SearchCache;
use crate::presentation::handlers::{crawl_handler, job_handler, search_handler};
use crate::presentation::middleware::auth_middleware::{auth_middleware, AuthState};
use crate::presentation::middleware::rate_limit_middleware::rate_limit_middleware;
use axum::{
    extract::Extension,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 路由依赖的组件
#[derive(Clone)]
pub struct AppComponents {
    pub search_service: Arc<SearchService>,
    pub search_cache: Arc<SearchCache>,
    pub job_service: Arc<JobService>,
    /// 为空时不做限流
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub auth: AuthState,
}

/// 创建应用路由
///
/// 受保护的路由依次经过认证和限流中间件，`/health` 与 `/v1/version` 不受限制
pub fn app(components: AppComponents) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let mut protected_routes = Router::new()
        .route("/v1/search", post(search_handler::search))
        .route("/v1/search/cache", delete(search_handler::purge_cache))
        .route("/v1/crawl", post(crawl_handler::create_crawl))
        .route("/v1/crawl/recrawl", post(crawl_handler::create_recrawl))
        .route("/v1/jobs/{id}", get(job_handler::get_job_status));

    // 后添加的层先执行，认证必须在限流之前
    if let Some(limiter) = components.rate_limiter {
        protected_routes = protected_routes.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }
    let protected_routes = protected_routes.layer(middleware::from_fn_with_state(
        components.auth,
        auth_middleware,
    ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(components.search_service))
        .layer(Extension(components.search_cache))
        .layer(Extension(components.job_service))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
