// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! An in-process `Coordinator` test double. Not a substitute for Redis in
//! production (it coordinates nothing across processes), but it implements
//! TTL expiry and list semantics closely enough to exercise every engine
//! invariant under `tokio::time::pause`/`advance` in tests.

use crate::coordinator::{Coordinator, MutexToken};
use anyhow::Result;
use async_trait::async_trait;
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};
use tokio::time::Instant;

#[derive(Default)]
struct State {
    strings: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    counters: HashMap<String, i64>,
    expiry: HashMap<String, Instant>,
}

impl State {
    fn purge_if_expired(&mut self, key: &str) {
        if let Some(&deadline) = self.expiry.get(key) {
            if Instant::now() >= deadline {
                self.strings.remove(key);
                self.lists.remove(key);
                self.counters.remove(key);
                self.expiry.remove(key);
            }
        }
    }
}

/// In-memory stand-in for Redis, used by the engine's own test suite and
/// available to downstream crates for testing their `Indexer` usage without
/// standing up a Redis instance.
#[derive(Default)]
pub struct InMemoryCoordinator {
    state: Mutex<State>,
}

impl InMemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Coordinator for InMemoryCoordinator {
    async fn try_acquire_mutex(
        &self,
        key: &str,
        ttl: Duration,
        wait_budget: Duration,
    ) -> Result<Option<MutexToken>> {
        let deadline = Instant::now() + wait_budget;
        loop {
            {
                let mut state = self.state.lock().unwrap();
                state.purge_if_expired(key);
                if !state.strings.contains_key(key) {
                    let token = MutexToken::new();
                    state.strings.insert(key.to_string(), token.as_str().to_string());
                    state.expiry.insert(key.to_string(), Instant::now() + ttl);
                    return Ok(Some(token));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    async fn release_mutex(&self, key: &str, token: &MutexToken) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.strings.get(key).map(|s| s.as_str()) == Some(token.as_str()) {
            state.strings.remove(key);
            state.expiry.remove(key);
        }
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.purge_if_expired(key);
        let counter = state.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn get_counter(&self, key: &str) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.purge_if_expired(key);
        Ok(state.counters.get(key).copied().unwrap_or(0))
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.purge_if_expired(key);
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.purge_if_expired(key);
        Ok(state.lists.get_mut(key).and_then(|list| list.pop_front()))
    }

    async fn lrem(&self, key: &str, count: i64, value: &str) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.purge_if_expired(key);
        let Some(list) = state.lists.get_mut(key) else {
            return Ok(0);
        };
        let mut removed = 0i64;
        let limit = if count == 0 { i64::MAX } else { count.abs() };
        if count >= 0 {
            let mut i = 0;
            while i < list.len() && removed < limit {
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < limit {
                i -= 1;
                if list[i] == value {
                    list.remove(i);
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn lrange(&self, key: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.purge_if_expired(key);
        Ok(state
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn llen(&self, key: &str) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.purge_if_expired(key);
        Ok(state.lists.get(key).map(|list| list.len() as i64).unwrap_or(0))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.expiry.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.strings.insert(key.to_string(), value.to_string());
        state.expiry.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.purge_if_expired(key);
        Ok(state.strings.contains_key(key))
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for key in keys {
            state.strings.remove(key);
            state.lists.remove(key);
            state.counters.remove(key);
            state.expiry.remove(key);
        }
        Ok(())
    }

    async fn occupy(
        &self,
        list_key: &str,
        shadow_key: &str,
        value: &str,
        running_ttl: Duration,
        concurrency_ttl: Duration,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .lists
            .entry(list_key.to_string())
            .or_default()
            .push_back(value.to_string());
        state.strings.insert(shadow_key.to_string(), "1".to_string());
        state.expiry.insert(shadow_key.to_string(), Instant::now() + running_ttl);
        state.expiry.insert(list_key.to_string(), Instant::now() + concurrency_ttl);
        Ok(())
    }

    async fn release_task(&self, list_key: &str, shadow_key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(list) = state.lists.get_mut(list_key) {
            if let Some(pos) = list.iter().position(|v| v == value) {
                list.remove(pos);
            }
        }
        state.strings.remove(shadow_key);
        state.expiry.remove(shadow_key);
        Ok(())
    }

    async fn enqueue_failed(&self, failed_key: &str, value: &str, retry_ttl: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .lists
            .entry(failed_key.to_string())
            .or_default()
            .push_back(value.to_string());
        state.expiry.insert(failed_key.to_string(), Instant::now() + retry_ttl);
        Ok(())
    }

    async fn migrate_zombie(&self, list_key: &str, failed_key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(list) = state.lists.get_mut(list_key) {
            if let Some(pos) = list.iter().position(|v| v == value) {
                list.remove(pos);
            }
        }
        state
            .lists
            .entry(failed_key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }
}
