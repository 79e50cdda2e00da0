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

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含服务器、数据库、Redis、搜索索引、队列、限流、认证、缓存等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 搜索索引配置
    pub search_index: SearchIndexSettings,
    /// 分发队列配置
    pub queue: QueueSettings,
    /// 速率限制配置
    pub rate_limiting: RateLimitingSettings,
    /// 认证配置
    pub auth: AuthSettings,
    /// 缓存配置
    pub cache: CacheSettings,
    /// 外部依赖调用配置
    pub dependencies: DependencySettings,
    /// 后台工作器配置
    pub workers: WorkerSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
    /// 日志配置
    pub logging: LoggingSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// Redis配置设置
///
/// `enabled = false` 时计数器与缓存退化为进程内实现，仅适用于单实例部署
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub enabled: bool,
    /// Redis连接URL
    pub url: String,
}

/// 搜索索引配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SearchIndexSettings {
    /// Elasticsearch 地址
    pub url: String,
    /// 索引名称
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// 队列后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// 基于数据库表的持久化队列
    Postgres,
    /// 进程内优先级队列
    Memory,
}

/// 分发队列配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    pub backend: QueueBackend,
    /// 普通爬取队列名
    pub crawl_queue: String,
    /// 重新爬取队列名
    pub recrawl_queue: String,
    /// 消息租约时长（秒），到期未确认的消息重新投递
    pub visibility_timeout_seconds: i64,
}

/// 速率限制配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitingSettings {
    /// 是否启用速率限制
    pub enabled: bool,
    /// 固定窗口长度（秒）
    pub window_seconds: u64,
    /// 已认证调用方默认每窗口请求数限制
    pub default_rpm: u32,
}

impl RateLimitingSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// 单个API密钥配置
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySettings {
    /// 密钥原文
    pub key: String,
    /// 调用方名称，同时作为限流标识
    pub name: String,
    /// 每窗口请求数限制，缺省时使用 `rate_limiting.default_rpm`
    pub rate_limit: Option<u32>,
}

/// 认证配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// 是否允许匿名访问
    pub allow_anonymous: bool,
    /// 匿名调用方每窗口请求数限制
    pub anonymous_rate_limit: u32,
    #[serde(default)]
    pub api_keys: Vec<ApiKeySettings>,
}

/// 缓存配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// 搜索结果缓存时间（秒）
    pub search_ttl_seconds: u64,
    /// 终态任务状态缓存时间（秒）
    pub job_status_ttl_seconds: u64,
    /// 非终态任务状态缓存时间（秒）
    pub job_status_pending_ttl_seconds: u64,
}

/// 外部依赖调用配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DependencySettings {
    /// 单次外部调用超时（毫秒）
    pub timeout_ms: u64,
}

impl DependencySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 后台工作器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    pub enabled: bool,
    /// 工作器数量
    pub count: usize,
    /// 队列为空时的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 抓取超时（秒）
    pub fetch_timeout_seconds: u64,
    /// 单条消息最大投递次数
    pub max_attempts: u32,
}

/// 指标导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus 监听地址
    pub address: String,
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub format: LogFormat,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default`、`config/{APP_ENVIRONMENT}` 和 `SEARCHRS__*` 环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SEARCHRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅从默认值和指定文件加载配置，不读取环境变量
    pub fn from_file(name: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name(name).required(false))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("database.url", "postgres://localhost:5432/searchrs")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("redis.enabled", true)?
            .set_default("redis.url", "redis://127.0.0.1:6379/0")?
            .set_default("search_index.url", "http://localhost:9200")?
            .set_default("search_index.index", "search_documents")?
            .set_default("queue.backend", "postgres")?
            .set_default("queue.crawl_queue", "crawl_queue")?
            .set_default("queue.recrawl_queue", "recrawl_queue")?
            .set_default("queue.visibility_timeout_seconds", 300)?
            .set_default("rate_limiting.enabled", true)?
            .set_default("rate_limiting.window_seconds", 60)?
            .set_default("rate_limiting.default_rpm", 1000)?
            .set_default("auth.allow_anonymous", true)?
            .set_default("auth.anonymous_rate_limit", 10)?
            .set_default("cache.search_ttl_seconds", 1800)?
            .set_default("cache.job_status_ttl_seconds", 3600)?
            .set_default("cache.job_status_pending_ttl_seconds", 5)?
            .set_default("dependencies.timeout_ms", 2000)?
            .set_default("workers.enabled", true)?
            .set_default("workers.count", 4)?
            .set_default("workers.poll_interval_ms", 500)?
            .set_default("workers.fetch_timeout_seconds", 30)?
            .set_default("workers.max_attempts", 3)?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.address", "0.0.0.0:9000")?
            .set_default("logging.format", "pretty")
    }
}
