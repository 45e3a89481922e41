// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use super::{CursorValue, Indexer};
use crate::{error::Result, keys, metrics};

impl<T: CursorValue> Indexer<T> {
    /// Pipelined enqueue onto the retry queue (spec §4.4). Retention is
    /// bounded by `retry_timeout`; entries older than that are dropped
    /// silently by the TTL expiry of the whole list key.
    pub async fn fail(&self, start: &T) -> Result<()> {
        let encoded = keys::encode(&self.name, start)?;
        let key = keys::failed_list(&self.name);
        self.coordinator
            .enqueue_failed(&key, &encoded, self.config.retry_timeout())
            .await
            .map_err(|e| crate::error::Error::coordinator(&self.name, e))?;
        metrics::RETRIES_ENQUEUED_TOTAL
            .with_label_values(&[self.name.as_str()])
            .inc();
        Ok(())
    }

    /// Dequeues the next failed start, if any (spec §4.4).
    pub async fn failed(&self) -> Result<Option<T>> {
        let key = keys::failed_list(&self.name);
        match self
            .coordinator
            .lpop(&key)
            .await
            .map_err(|e| crate::error::Error::coordinator(&self.name, e))?
        {
            Some(raw) => Ok(Some(keys::decode(&self.name, &raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::IndexerConfig, engine::IndexerBuilder, hooks::Hooks, testing::InMemoryCoordinator};
    use std::sync::Arc;

    #[tokio::test]
    async fn retry_queue_is_fifo() {
        let config = IndexerConfig::new("orders");
        let hooks = Hooks::new(|c: &u64| c + 1).with_initial(|| 0u64);
        let indexer = IndexerBuilder::new(config, hooks)
            .with_coordinator(Arc::new(InMemoryCoordinator::new()))
            .build()
            .unwrap();

        indexer.fail(&1u64).await.unwrap();
        indexer.fail(&2u64).await.unwrap();

        assert_eq!(indexer.failed().await.unwrap(), Some(1));
        assert_eq!(indexer.failed().await.unwrap(), Some(2));
        assert_eq!(indexer.failed().await.unwrap(), None);
    }
}
