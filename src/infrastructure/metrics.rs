// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 安装 Prometheus 导出器并注册指标说明
///
/// 地址无效或端口被占用时只记录警告，服务照常启动
pub fn init_metrics(address: &str) {
    let addr: SocketAddr = match address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address '{}': {}. Metrics exporter disabled.", address, e);
            return;
        }
    };

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(
        "rate_limit_decisions_total",
        "Rate limit admission decisions by outcome"
    );
    describe_counter!(
        "search_cache_lookups_total",
        "Search cache lookups by outcome"
    );
    describe_counter!("search_requests_total", "Search requests served");
    describe_counter!("jobs_submitted_total", "Jobs persisted and dispatched by kind");
    describe_counter!("job_transitions_total", "Applied job state transitions by target state");
    describe_counter!(
        "job_transition_conflicts_total",
        "Rejected job transitions against terminal jobs"
    );
    describe_counter!(
        "job_duplicate_deliveries_total",
        "Dispatch messages dropped because the job was already claimed"
    );
    describe_counter!(
        "job_retries_total",
        "Dispatch messages requeued after a retryable fetch failure"
    );
    describe_counter!(
        "job_sla_breaches_total",
        "Recrawl jobs finished after their SLA deadline"
    );
    describe_histogram!(
        "search_latency_ms",
        Unit::Milliseconds,
        "End-to-end search latency"
    );
}
