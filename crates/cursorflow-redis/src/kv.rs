// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Redis-backed `KvStore<T>`: the cursor value survives a process restart
//! and is visible to every worker sharing the same Redis instance, unlike
//! `cursorflow_core::kv::InMemoryKvStore`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use cursorflow_core::kv::KvStore;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;

pub struct RedisKvStore<T> {
    conn: ConnectionManager,
    _value: PhantomData<fn() -> T>,
}

impl<T> RedisKvStore<T> {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("failed to create redis client for {redis_url}"))?;
        let conn = client
            .get_tokio_connection_manager()
            .await
            .context("failed to establish redis connection manager")?;
        Ok(Self { conn, _value: PhantomData })
    }
}

#[async_trait]
impl<T> KvStore<T> for RedisKvStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.context("GET failed")?;
        raw.map(|raw| serde_json::from_str(&raw).context("failed to decode stored cursor value"))
            .transpose()
    }

    async fn set(&self, key: &str, value: T) -> Result<()> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(&value).context("failed to encode cursor value")?;
        conn.set(key, raw).await.context("SET failed")
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del(key).await.context("DEL failed")
    }
}
