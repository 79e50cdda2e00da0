// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::domain::models::search::{total_pages, SearchQuery, SearchResponse, SearchResultItem};
use crate::domain::search::index::{IndexHit, SearchIndex};
use crate::infrastructure::cache::cache_manager::SearchCache;
use crate::utils::errors::{Dependency, ServiceError};
use crate::utils::timeout::bounded;

/// 搜索服务
///
/// 旁路缓存的查询路径：先查缓存，未命中时查询索引并回写缓存。
/// 缓存只是加速层，读写失败都降级为直接查询索引。
pub struct SearchService {
    index: Arc<dyn SearchIndex>,
    cache: Arc<SearchCache>,
    timeout: Duration,
}

impl SearchService {
    pub fn new(index: Arc<dyn SearchIndex>, cache: Arc<SearchCache>, timeout: Duration) -> Self {
        Self {
            index,
            cache,
            timeout,
        }
    }

    /// 执行搜索
    ///
    /// # 参数
    ///
    /// * `query` - 已校验的查询
    ///
    /// # 返回值
    ///
    /// * `Ok(SearchResponse)` - 命中缓存时 `cached=true`
    /// * `Err(ServiceError)` - 索引不可用或超时
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ServiceError> {
        let started = Instant::now();
        metrics::counter!("search_requests_total").increment(1);
        let key = SearchCache::key_for(query);

        match self.cache.lookup::<SearchResponse>(&key).await {
            Ok(Some(entry)) => {
                metrics::counter!("search_cache_lookups_total", "outcome" => "hit").increment(1);
                let mut response = entry.payload;
                response.query = query.text().to_string();
                response.cached = true;
                response.search_time_ms = elapsed_ms(started);
                metrics::histogram!("search_latency_ms").record(response.search_time_ms);
                debug!(key = %key, "Search served from cache");
                return Ok(response);
            }
            Ok(None) => {
                metrics::counter!("search_cache_lookups_total", "outcome" => "miss").increment(1);
            }
            Err(e) => {
                metrics::counter!("search_cache_lookups_total", "outcome" => "error").increment(1);
                warn!(key = %key, error = %e, "Cache lookup failed, querying index directly");
            }
        }

        let page = bounded(
            Dependency::SearchIndex,
            self.timeout,
            self.index
                .query(query.text(), query.page_size(), query.offset()),
        )
        .await?;

        let mut response = SearchResponse {
            query: query.text().to_string(),
            total_results: page.total,
            page: query.page(),
            page_size: query.page_size(),
            total_pages: total_pages(page.total, query.page_size()),
            results: page.hits.into_iter().map(SearchResultItem::from).collect(),
            search_time_ms: 0.0,
            cached: false,
        };

        if let Err(e) = self.cache.store(&key, &response, None).await {
            warn!(key = %key, error = %e, "Failed to cache search results");
        }

        response.search_time_ms = elapsed_ms(started);
        metrics::histogram!("search_latency_ms").record(response.search_time_ms);
        info!(
            query = %query.text(),
            total_results = response.total_results,
            index = self.index.name(),
            "Search completed"
        );
        Ok(response)
    }
}

impl From<IndexHit> for SearchResultItem {
    fn from(hit: IndexHit) -> Self {
        Self {
            url: hit.url,
            title: hit.title,
            snippet: hit.snippet_source,
            domain: hit.domain,
            crawl_date: hit.date,
            score: hit.score,
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
