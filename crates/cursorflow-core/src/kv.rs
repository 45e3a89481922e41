// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Durable read/write of the current cursor value (spec §6.4). The default
//! implementation is an in-process map; callers who need the cursor to
//! survive a process restart supply their own `KvStore` impl.

use anyhow::Result;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Mutex};

/// Minimal key-value capability the cursor store needs. Implementations are
/// free to share one underlying store across many indexer names as long as
/// they respect the key argument as the sole partition.
#[async_trait]
pub trait KvStore<T>: Send + Sync
where
    T: Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<T>>;
    async fn set(&self, key: &str, value: T) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Default `KvStore`: an in-process map. Values do not survive a process
/// restart; callers that need durability must supply their own
/// implementation backed by a real store.
#[derive(Default)]
pub struct InMemoryKvStore<T> {
    values: Mutex<HashMap<String, T>>,
}

impl<T> InMemoryKvStore<T> {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<T> KvStore<T> for InMemoryKvStore<T>
where
    T: Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<T>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: T) -> Result<()> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_values() {
        let store: InMemoryKvStore<u64> = InMemoryKvStore::new();
        assert_eq!(store.get("indexer:n").await.unwrap(), None);
        store.set("indexer:n", 42).await.unwrap();
        assert_eq!(store.get("indexer:n").await.unwrap(), Some(42));
        store.delete("indexer:n").await.unwrap();
        assert_eq!(store.get("indexer:n").await.unwrap(), None);
    }
}
