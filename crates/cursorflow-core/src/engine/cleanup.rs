// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use super::{CursorValue, Indexer};
use crate::{error::Result, keys, metrics};

impl<T: CursorValue> Indexer<T> {
    /// Scans the live-task list and migrates zombies — entries whose shadow
    /// key has expired — to the retry queue (spec §4.5). Driven by an
    /// external timer, not a self-managed ticker (spec §9).
    ///
    /// Idempotent under concurrent/repeated invocation: `LREM`/`RPUSH`
    /// operate on exact-match entries, so a zombie already migrated is
    /// simply absent from the live list on the next scan.
    pub async fn cleanup(&self) -> Result<()> {
        let list_key = keys::concurrency_list(&self.name);
        let failed_key = keys::failed_list(&self.name);

        let entries = self
            .coordinator
            .lrange(&list_key)
            .await
            .map_err(|e| crate::error::Error::coordinator(&self.name, e))?;

        for encoded in entries {
            let shadow_key = keys::shadow(&self.name, &encoded);
            let alive = self
                .coordinator
                .exists(&shadow_key)
                .await
                .map_err(|e| crate::error::Error::coordinator(&self.name, e))?;
            if alive {
                continue;
            }

            tracing::warn!(
                indexer = %self.name,
                start = %encoded,
                "zombie task detected; migrating to retry queue"
            );
            self.coordinator
                .migrate_zombie(&list_key, &failed_key, &encoded)
                .await
                .map_err(|e| crate::error::Error::coordinator(&self.name, e))?;
            metrics::ZOMBIES_REAPED_TOTAL
                .with_label_values(&[self.name.as_str()])
                .inc();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::IndexerConfig, engine::IndexerBuilder, hooks::Hooks, testing::InMemoryCoordinator};
    use std::{sync::Arc, time::Duration};

    #[tokio::test(start_paused = true)]
    async fn zombie_is_migrated_to_retry_after_shadow_expires() {
        let config = IndexerConfig::new("orders").with_running_timeout_secs(1);
        let hooks = Hooks::new(|c: &u64| c + 1).with_initial(|| 0u64);
        let indexer = IndexerBuilder::new(config, hooks)
            .with_coordinator(Arc::new(InMemoryCoordinator::new()))
            .build()
            .unwrap();

        indexer.occupy(&7u64).await;
        assert!(indexer.admission_blocked().await.is_ok());

        // Strictly between running_timeout (1s, the shadow's TTL) and
        // concurrency_timeout (2s, the live list's TTL): the shadow must
        // have expired while the list itself has not, or `cleanup` finds
        // neither a shadow nor a list to scan.
        tokio::time::advance(Duration::from_millis(1500)).await;
        indexer.cleanup().await.unwrap();

        assert_eq!(indexer.failed().await.unwrap(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_is_idempotent_across_repeated_runs() {
        let config = IndexerConfig::new("orders").with_running_timeout_secs(1);
        let hooks = Hooks::new(|c: &u64| c + 1).with_initial(|| 0u64);
        let indexer = IndexerBuilder::new(config, hooks)
            .with_coordinator(Arc::new(InMemoryCoordinator::new()))
            .build()
            .unwrap();

        indexer.occupy(&7u64).await;
        tokio::time::advance(Duration::from_millis(1500)).await;

        indexer.cleanup().await.unwrap();
        indexer.cleanup().await.unwrap();

        assert_eq!(indexer.failed().await.unwrap(), Some(7));
        assert_eq!(indexer.failed().await.unwrap(), None);
    }
}
