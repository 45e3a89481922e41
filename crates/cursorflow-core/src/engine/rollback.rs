// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use super::{CursorValue, Indexer};
use crate::{
    error::{Error, Result},
    keys, metrics,
};

impl<T: CursorValue> Indexer<T> {
    /// Under the cursor lock: invokes the user `on_rollback` hook, resets
    /// the cursor to `target`, clears all live-task entries (and their
    /// shadows) and the retry queue, and increments the epoch (spec §4.6).
    ///
    /// A failing `on_rollback` hook aborts the rollback entirely: the cursor
    /// is left untouched and the epoch is not incremented.
    pub async fn rollback(&self, target: T) -> Result<()> {
        self.with_cursor_lock(|| async {
            let from = self.current().await?;

            self.hooks
                .on_rollback(from.clone(), target.clone())
                .await
                .map_err(|source| Error::Callback {
                    indexer: self.name().to_string(),
                    source,
                })?;

            self.write_cursor(target.clone()).await?;

            let list_key = keys::concurrency_list(self.name());
            let failed_key = keys::failed_list(self.name());
            let entries = self
                .coordinator
                .lrange(&list_key)
                .await
                .map_err(|e| Error::coordinator(self.name(), e))?;

            let mut keys_to_delete: Vec<String> = entries
                .iter()
                .map(|encoded| keys::shadow(self.name(), encoded))
                .collect();
            keys_to_delete.push(list_key);
            keys_to_delete.push(failed_key);
            self.coordinator
                .delete(&keys_to_delete)
                .await
                .map_err(|e| Error::coordinator(self.name(), e))?;

            let epoch_key = keys::epoch(self.name());
            let new_epoch = self
                .coordinator
                .incr(&epoch_key)
                .await
                .map_err(|e| Error::coordinator(self.name(), e))?;

            metrics::ROLLBACKS_TOTAL
                .with_label_values(&[self.name()])
                .inc();
            metrics::CURRENT_EPOCH
                .with_label_values(&[self.name()])
                .set(new_epoch);

            Ok(())
        })
        .await
    }
}
