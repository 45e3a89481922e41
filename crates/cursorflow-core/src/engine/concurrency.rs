// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use super::{CursorValue, Indexer};
use crate::{error::Result, keys, metrics};

impl<T: CursorValue> Indexer<T> {
    /// Admission test against the `concurrency` cap (spec §4.3). Returns
    /// `true` when the cap is configured and already reached — i.e. the
    /// caller should back off without dispatching. Admission is disabled
    /// (always admits) when no cap is configured.
    pub(crate) async fn admission_blocked(&self) -> Result<bool> {
        let Some(cap) = self.config.concurrency else {
            return Ok(false);
        };
        let key = keys::concurrency_list(&self.name);
        let live = self
            .coordinator
            .llen(&key)
            .await
            .map_err(|e| crate::error::Error::coordinator(&self.name, e))?;
        metrics::LIVE_TASKS
            .with_label_values(&[self.name.as_str()])
            .set(live);
        Ok(live >= cap as i64)
    }

    /// Pipelined occupy (spec §4.3). Must not throw: a coordinator failure
    /// here is logged, not propagated, so that accounting never skews the
    /// caller's error path.
    pub(crate) async fn occupy(&self, start: &T) {
        let Ok(encoded) = keys::encode(&self.name, start) else {
            tracing::error!(indexer = %self.name, "failed to encode start value for occupy");
            return;
        };
        let list_key = keys::concurrency_list(&self.name);
        let shadow_key = keys::shadow(&self.name, &encoded);
        if let Err(e) = self
            .coordinator
            .occupy(
                &list_key,
                &shadow_key,
                &encoded,
                self.config.running_timeout(),
                self.config.concurrency_timeout(),
            )
            .await
        {
            tracing::error!(indexer = %self.name, error = %e, "occupy failed");
        }
    }

    /// Pipelined release (spec §4.3). Must not throw, and must always run —
    /// including on callback error and epoch mismatch (spec §4.7) — so the
    /// live-task list never leaks an entry.
    pub(crate) async fn release(&self, start: &T) {
        let Ok(encoded) = keys::encode(&self.name, start) else {
            tracing::error!(indexer = %self.name, "failed to encode start value for release");
            return;
        };
        let list_key = keys::concurrency_list(&self.name);
        let shadow_key = keys::shadow(&self.name, &encoded);
        if let Err(e) = self
            .coordinator
            .release_task(&list_key, &shadow_key, &encoded)
            .await
        {
            tracing::error!(indexer = %self.name, error = %e, "release failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::IndexerConfig, engine::IndexerBuilder, hooks::Hooks, testing::InMemoryCoordinator};
    use std::sync::Arc;

    #[tokio::test]
    async fn admission_blocks_once_cap_is_reached() {
        let config = IndexerConfig::new("orders").with_concurrency(1);
        let hooks = Hooks::new(|c: &u64| c + 1).with_initial(|| 0u64);
        let indexer = IndexerBuilder::new(config, hooks)
            .with_coordinator(Arc::new(InMemoryCoordinator::new()))
            .build()
            .unwrap();

        assert!(!indexer.admission_blocked().await.unwrap());
        indexer.occupy(&0u64).await;
        assert!(indexer.admission_blocked().await.unwrap());
        indexer.release(&0u64).await;
        assert!(!indexer.admission_blocked().await.unwrap());
    }
}
