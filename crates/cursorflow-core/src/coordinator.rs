// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! The shared-coordinator capability set (spec §6.3): a mutex, an atomic
//! counter, lists, TTL-bounded keys, and the handful of pipelined compound
//! operations the engine needs in a single round trip. Canonically backed by
//! Redis (`cursorflow-redis`), but any implementation of this trait is
//! compatible.

use anyhow::Result;
use async_trait::async_trait;
use std::{fmt, time::Duration};

/// Opaque ownership token for a held mutex, used to release only the lock an
/// instance actually holds (compare-and-delete), never a lock some other
/// holder re-acquired after this one's TTL expired.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutexToken(pub(crate) String);

impl MutexToken {
    pub fn new() -> Self {
        MutexToken(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MutexToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability set consumed by the engine. Every method may suspend on a
/// network round trip (spec §5): there is no assumption here about whether
/// the caller is a preemptive thread or a cooperative task.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Attempt to acquire `key` as a mutex with the given TTL, retrying until
    /// `wait_budget` elapses. Returns `None` if the budget is exhausted
    /// without acquiring the lock.
    async fn try_acquire_mutex(
        &self,
        key: &str,
        ttl: Duration,
        wait_budget: Duration,
    ) -> Result<Option<MutexToken>>;

    /// Release `key`, but only if it is still held by `token` (compare and
    /// delete). Releasing a lock this instance no longer holds (TTL already
    /// expired and reacquired elsewhere) is a no-op, not an error.
    async fn release_mutex(&self, key: &str, token: &MutexToken) -> Result<()>;

    /// `INCR key`. Returns the post-increment value.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// `GET key` parsed as an integer counter; absent key reads as 0.
    async fn get_counter(&self, key: &str) -> Result<i64>;

    async fn rpush(&self, key: &str, value: &str) -> Result<()>;
    async fn lpop(&self, key: &str) -> Result<Option<String>>;
    /// `LREM key count value`. Returns the number of elements removed.
    async fn lrem(&self, key: &str, count: i64, value: &str) -> Result<i64>;
    async fn lrange(&self, key: &str) -> Result<Vec<String>>;
    async fn llen(&self, key: &str) -> Result<i64>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
    async fn delete(&self, keys: &[String]) -> Result<()>;

    /// Pipelined, single round trip (spec §4.3): append `value` onto the
    /// live-task list, set its shadow key, and refresh the list's sliding
    /// TTL.
    async fn occupy(
        &self,
        list_key: &str,
        shadow_key: &str,
        value: &str,
        running_ttl: Duration,
        concurrency_ttl: Duration,
    ) -> Result<()>;

    /// Pipelined, single round trip (spec §4.3): remove exactly one
    /// occurrence of `value` from the live-task list and delete its shadow
    /// key.
    async fn release_task(&self, list_key: &str, shadow_key: &str, value: &str) -> Result<()>;

    /// Pipelined, single round trip (spec §4.4): push `value` onto the retry
    /// queue and refresh its TTL.
    async fn enqueue_failed(&self, failed_key: &str, value: &str, retry_ttl: Duration) -> Result<()>;

    /// Pipelined migration of a single zombie entry (spec §4.5): remove one
    /// occurrence of `value` from the live-task list and push it onto the
    /// retry queue.
    async fn migrate_zombie(&self, list_key: &str, failed_key: &str, value: &str) -> Result<()>;
}
