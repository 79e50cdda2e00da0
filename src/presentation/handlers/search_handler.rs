// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    Json,
};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::{
    application::dto::search_request::{
        PurgeCacheRequestDto, PurgeCacheResponseDto, SearchRequestDto,
    },
    domain::{models::search::SearchResponse, services::search_service::SearchService},
    infrastructure::cache::cache_manager::SearchCache,
    presentation::errors::AppError,
};

/// 处理搜索请求
///
/// # 错误
///
/// 可能在以下情况下返回错误响应：
/// - 查询为空、超长或分页参数越界（400）
/// - 搜索索引不可用或超时（503）
pub async fn search(
    Extension(service): Extension<Arc<SearchService>>,
    payload: Result<Json<SearchRequestDto>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;
    let query = payload.into_query()?;

    let response = service.search(&query).await?;
    Ok(Json(response))
}

/// 清理搜索缓存
///
/// 带 `query` 参数时删除该查询的所有分页结果，否则清空全部搜索缓存
pub async fn purge_cache(
    Extension(cache): Extension<Arc<SearchCache>>,
    Query(params): Query<PurgeCacheRequestDto>,
) -> Result<Json<PurgeCacheResponseDto>, AppError> {
    let purged = match params.query.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => cache.invalidate_query(text).await?,
        _ => cache.clear_all().await?,
    };

    info!(purged, query = ?params.query, "Search cache purged");
    Ok(Json(PurgeCacheResponseDto { purged }))
}
