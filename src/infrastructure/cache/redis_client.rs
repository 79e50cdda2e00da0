// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::repositories::counter_backend::{
    CounterBackend, CounterBackendError, CounterState,
};

/// 自增并在键首次创建时设置过期时间
///
/// 返回 `{count, pttl}`，整个脚本在 Redis 内原子执行
const INCR_WITH_EXPIRY_SCRIPT: &str = r#"
    local count = redis.call("INCR", KEYS[1])
    local ttl = redis.call("PTTL", KEYS[1])
    if ttl < 0 then
        redis.call("PEXPIRE", KEYS[1], ARGV[1])
        ttl = tonumber(ARGV[1])
    end
    return {count, ttl}
"#;

/// SCAN 每批返回的键数量提示
const SCAN_BATCH: usize = 200;

/// Redis客户端
///
/// 基于Redis实现的计数器后端，限流计数与结果缓存共用
#[derive(Clone)]
pub struct RedisClient {
    /// Redis客户端
    client: redis::Client,
}

impl RedisClient {
    /// 创建新的Redis客户端实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisClient)` - Redis客户端实例
    /// * `Err(CounterBackendError)` - URL无效
    pub fn new(redis_url: &str) -> Result<Self, CounterBackendError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CounterBackendError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// 连通性检查
    pub async fn ping(&self) -> Result<(), CounterBackendError> {
        let mut con = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    (duration.as_millis() as u64).max(1)
}

#[async_trait]
impl CounterBackend for RedisClient {
    async fn incr_with_expiry(
        &self,
        key: &str,
        expiry: Duration,
    ) -> Result<CounterState, CounterBackendError> {
        let mut con = self.connection().await?;
        let result: Vec<i64> = redis::Script::new(INCR_WITH_EXPIRY_SCRIPT)
            .key(key)
            .arg(millis(expiry))
            .invoke_async(&mut con)
            .await?;

        match result.as_slice() {
            [count, ttl] => Ok(CounterState {
                count: *count,
                ttl: (*ttl > 0).then(|| Duration::from_millis(*ttl as u64)),
            }),
            other => Err(CounterBackendError::Unavailable(format!(
                "unexpected script reply: {:?}",
                other
            ))),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CounterBackendError> {
        let mut con = self.connection().await?;
        let value: Option<String> = con.get(key).await?;
        Ok(value)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry: Duration,
    ) -> Result<(), CounterBackendError> {
        let mut con = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(expiry))
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CounterBackendError> {
        let mut con = self.connection().await?;
        let ttl: i64 = con.pttl(key).await?;
        // -2 表示键不存在，-1 表示没有过期时间
        Ok((ttl > 0).then(|| Duration::from_millis(ttl as u64)))
    }

    async fn delete(&self, key: &str) -> Result<bool, CounterBackendError> {
        let mut con = self.connection().await?;
        let removed: u64 = con.del(key).await?;
        Ok(removed > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CounterBackendError> {
        let mut con = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut con)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = con.del(&keys).await?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}
