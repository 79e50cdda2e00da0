// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::repositories::counter_backend::{
    CounterBackend, CounterBackendError, CounterState,
};
use crate::utils::glob::glob_to_regex;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }

    fn ttl(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|at| at.saturating_duration_since(now))
    }
}

/// 进程内计数器后端
///
/// 单实例部署和测试使用。自增在 DashMap 分片锁内完成，对同一个键是原子的。
/// 过期时间基于 `tokio::time::Instant`，测试中可以暂停和推进时钟。
#[derive(Default)]
pub struct MemoryCounterBackend {
    entries: DashMap<String, Entry>,
}

impl MemoryCounterBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterBackend for MemoryCounterBackend {
    async fn incr_with_expiry(
        &self,
        key: &str,
        expiry: Duration,
    ) -> Result<CounterState, CounterBackendError> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                value: "0".to_string(),
                expires_at: None,
            });

        if !entry.is_live(now) {
            *entry = Entry {
                value: "0".to_string(),
                expires_at: None,
            };
        }

        let current: i64 = entry.value.parse().map_err(|_| {
            CounterBackendError::Unavailable(format!("value at '{}' is not an integer", key))
        })?;
        let count = current + 1;
        entry.value = count.to_string();
        if entry.expires_at.is_none() {
            entry.expires_at = Some(now + expiry);
        }

        Ok(CounterState {
            count,
            ttl: entry.ttl(now),
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CounterBackendError> {
        let now = Instant::now();
        let found = self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));

        match found {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| !entry.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry: Duration,
    ) -> Result<(), CounterBackendError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + expiry),
            },
        );
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CounterBackendError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.ttl(now)))
    }

    async fn delete(&self, key: &str) -> Result<bool, CounterBackendError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CounterBackendError> {
        let matcher = glob_to_regex(pattern)
            .map_err(|e| CounterBackendError::Unavailable(format!("invalid pattern: {}", e)))?;
        let now = Instant::now();
        let mut removed = 0u64;

        self.entries.retain(|key, entry| {
            if matcher.is_match(key) {
                if entry.is_live(now) {
                    removed += 1;
                }
                false
            } else {
                true
            }
        });

        Ok(removed)
    }
}
