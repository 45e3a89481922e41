// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use super::{CursorValue, Indexer};
use crate::{
    error::{Error, Result},
    keys,
};

/// The result of a successful `atomic()` claim: the half-open interval
/// `[start, ended)` plus the epoch observed at claim time (spec §4.2).
#[derive(Clone, Debug)]
pub struct AtomicClaim<T> {
    pub start: T,
    pub ended: T,
    pub epoch: u64,
}

impl<T: CursorValue> Indexer<T> {
    /// Claims the next interval under the cursor lock: read `current`,
    /// evaluate `latest`, compute and pre-write `ended`, read the epoch.
    /// Fails with `ReachedLatest` without mutating the cursor if the
    /// terminal predicate is true; fails with `LockUnavailable` if the lock
    /// could not be acquired within its wait budget (spec §4.2).
    pub async fn atomic(&self) -> Result<AtomicClaim<T>> {
        self.with_cursor_lock(|| async {
            let start = self.current().await?;
            if self.hooks.latest(&start) {
                let encoded = keys::encode(self.name(), &start)?;
                return Err(Error::ReachedLatest {
                    indexer: self.name().to_string(),
                    cursor: encoded,
                });
            }
            let ended = self.hooks.step(&start);
            self.write_cursor(ended.clone()).await?;
            let epoch = self.epoch().await?;
            Ok(AtomicClaim { start, ended, epoch })
        })
        .await
    }
}
