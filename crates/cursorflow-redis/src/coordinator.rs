// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Redis-backed `Coordinator` (spec §6.3). Connects through
//! `redis::aio::ConnectionManager`, which transparently reconnects on a lost
//! connection the same way `indexer-grpc-cache-worker`'s `Worker::run` does
//! by re-fetching a connection manager on every outer retry loop — here the
//! manager itself absorbs that reconnection, so callers never see it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use cursorflow_core::coordinator::{Coordinator, MutexToken};
use once_cell::sync::Lazy;
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use std::time::Duration;

/// Releases `key` only if its current value still matches the supplied
/// token — compare-and-delete, so a TTL-expired-and-reacquired lock is
/// never torn down out from under its new holder.
static RELEASE_MUTEX_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        if redis.call("get", KEYS[1]) == ARGV[1] then
            return redis.call("del", KEYS[1])
        else
            return 0
        end
        "#,
    )
});

pub struct RedisCoordinator {
    conn: ConnectionManager,
}

impl RedisCoordinator {
    /// Opens a client for `redis_url` and eagerly establishes the
    /// connection manager (spec §6.3: the coordinator is reachable as soon
    /// as construction succeeds).
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("failed to create redis client for {redis_url}"))?;
        let conn = client
            .get_tokio_connection_manager()
            .await
            .context("failed to establish redis connection manager")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Coordinator for RedisCoordinator {
    async fn try_acquire_mutex(
        &self,
        key: &str,
        ttl: Duration,
        wait_budget: Duration,
    ) -> Result<Option<MutexToken>> {
        let deadline = tokio::time::Instant::now() + wait_budget;
        let mut conn = self.conn.clone();
        loop {
            let token = MutexToken::new();
            let acquired: bool = redis::cmd("SET")
                .arg(key)
                .arg(token.as_str())
                .arg("NX")
                .arg("PX")
                .arg(ttl.as_millis() as u64)
                .query_async(&mut conn)
                .await
                .context("SET NX PX for mutex acquisition failed")?;
            if acquired {
                return Ok(Some(token));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tracing::trace!(key, "mutex held by another holder; retrying within wait budget");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn release_mutex(&self, key: &str, token: &MutexToken) -> Result<()> {
        let mut conn = self.conn.clone();
        RELEASE_MUTEX_SCRIPT
            .key(key)
            .arg(token.as_str())
            .invoke_async::<_, i64>(&mut conn)
            .await
            .context("compare-and-delete mutex release failed")?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await.context("INCR failed")
    }

    async fn get_counter(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(key).await.context("GET failed")?;
        Ok(value.unwrap_or(0))
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.rpush(key, value).await.context("RPUSH failed")
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.lpop(key, None).await.context("LPOP failed")
    }

    async fn lrem(&self, key: &str, count: i64, value: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.lrem(key, count as isize, value).await.context("LREM failed")
    }

    async fn lrange(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(key, 0, -1).await.context("LRANGE failed")
    }

    async fn llen(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.llen(key).await.context("LLEN failed")
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl.as_secs() as usize).await.context("EXPIRE failed")
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs() as usize)
            .await
            .context("SET EX failed")
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.context("EXISTS failed")
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.del(keys).await.context("DEL failed")
    }

    async fn occupy(
        &self,
        list_key: &str,
        shadow_key: &str,
        value: &str,
        running_ttl: Duration,
        concurrency_ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .rpush(list_key, value)
            .ignore()
            .expire(list_key, concurrency_ttl.as_secs() as usize)
            .ignore()
            .set_ex(shadow_key, "1", running_ttl.as_secs() as usize)
            .ignore()
            .query_async(&mut conn)
            .await
            .context("pipelined occupy failed")
    }

    async fn release_task(&self, list_key: &str, shadow_key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .lrem(list_key, 1, value)
            .ignore()
            .del(shadow_key)
            .ignore()
            .query_async(&mut conn)
            .await
            .context("pipelined release failed")
    }

    async fn enqueue_failed(&self, failed_key: &str, value: &str, retry_ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .rpush(failed_key, value)
            .ignore()
            .expire(failed_key, retry_ttl.as_secs() as usize)
            .ignore()
            .query_async(&mut conn)
            .await
            .context("pipelined enqueue_failed failed")
    }

    async fn migrate_zombie(&self, list_key: &str, failed_key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .lrem(list_key, 1, value)
            .ignore()
            .rpush(failed_key, value)
            .ignore()
            .query_async(&mut conn)
            .await
            .context("pipelined migrate_zombie failed")
    }
}
