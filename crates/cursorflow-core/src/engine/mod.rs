// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! The per-indexer coordination engine (spec §2-§4). `Indexer<T>` is a value
//! holding its hooks, config, and the two abstract collaborators (KV store,
//! coordinator) — not a registered singleton reached through module-level
//! metadata, per spec §9's redesign note.

mod atomic;
mod cleanup;
mod concurrency;
mod consume;
#[cfg(test)]
mod proptest_invariants;
mod retry;
mod rollback;

pub use atomic::AtomicClaim;
pub use consume::{ConsumeOptions, ConsumeOutcome};

use crate::{
    config::IndexerConfig,
    coordinator::Coordinator,
    error::{Error, Result},
    hooks::Hooks,
    keys,
    kv::KvStore,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Bound required of a cursor value throughout the engine: it must be
/// cloneable, totally ordered by the caller's `step`, and losslessly
/// serializable (spec §3) so the same encoding is used as a list element and
/// a shadow-key suffix.
pub trait CursorValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static> CursorValue for T {}

/// One named indexer: the cursor controller, atomic claimer, concurrency
/// accountant, retry queue, zombie reaper, and rollback/epoch machinery all
/// live as methods on this value.
pub struct Indexer<T: CursorValue> {
    name: String,
    config: IndexerConfig,
    hooks: Hooks<T>,
    kv: Arc<dyn KvStore<T>>,
    coordinator: Arc<dyn Coordinator>,
}

/// Builds an `Indexer<T>` from its config and collaborators (spec §9: a
/// builder/factory keyed by name, replacing decorator-based registration).
pub struct IndexerBuilder<T: CursorValue> {
    config: IndexerConfig,
    hooks: Hooks<T>,
    kv: Option<Arc<dyn KvStore<T>>>,
    coordinator: Option<Arc<dyn Coordinator>>,
}

impl<T: CursorValue> IndexerBuilder<T> {
    pub fn new(config: IndexerConfig, hooks: Hooks<T>) -> Self {
        Self {
            config,
            hooks,
            kv: None,
            coordinator: None,
        }
    }

    pub fn with_kv_store(mut self, kv: Arc<dyn KvStore<T>>) -> Self {
        self.kv = Some(kv);
        self
    }

    pub fn with_coordinator(mut self, coordinator: Arc<dyn Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Builds the indexer. Fails with `Misconfiguration` if a coordinator was
    /// never supplied: every operation beyond `current`/`next`/`step` needs
    /// one.
    pub fn build(self) -> Result<Indexer<T>> {
        let coordinator = self.coordinator.ok_or_else(|| {
            Error::misconfiguration(&self.config.name, "no coordinator supplied to the builder")
        })?;
        let kv = self
            .kv
            .unwrap_or_else(|| Arc::new(crate::kv::InMemoryKvStore::new()));
        Ok(Indexer {
            name: self.config.name.clone(),
            config: self.config,
            hooks: self.hooks,
            kv,
            coordinator,
        })
    }
}

impl<T: CursorValue> Indexer<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Returns the stored cursor value, or the resolved **initial** if the
    /// store is empty (spec §4.1).
    pub async fn current(&self) -> Result<T> {
        let key = keys::cursor(&self.name);
        match self
            .kv
            .get(&key)
            .await
            .map_err(|e| Error::coordinator(&self.name, e))?
        {
            Some(value) => Ok(value),
            None => self.resolve_initial(),
        }
    }

    fn resolve_initial(&self) -> Result<T> {
        self.hooks.initial().ok_or_else(|| {
            Error::misconfiguration(
                &self.name,
                "cursor store is empty and no initial value is configured",
            )
        })
    }

    /// With `v` given, writes it unconditionally. Without `v`, computes
    /// `step(current())` and writes the result (spec §4.1). Last-writer-wins
    /// at the store level.
    pub async fn next(&self, v: Option<T>) -> Result<T> {
        let value = match v {
            Some(value) => value,
            None => {
                let current = self.current().await?;
                self.hooks.step(&current)
            },
        };
        self.write_cursor(value.clone()).await?;
        Ok(value)
    }

    async fn write_cursor(&self, value: T) -> Result<()> {
        let key = keys::cursor(&self.name);
        self.kv
            .set(&key, value)
            .await
            .map_err(|e| Error::coordinator(&self.name, e))
    }

    /// Invokes `stepFn(c ?? current())`. Must be deterministic and
    /// side-effect-free by the caller's contract (spec §4.1).
    pub async fn step(&self, c: Option<T>) -> Result<T> {
        let current = match c {
            Some(c) => c,
            None => self.current().await?,
        };
        Ok(self.hooks.step(&current))
    }

    /// Invokes the user `latest` predicate against the current cursor.
    /// Absent predicate means never terminal (spec §4.1).
    pub async fn latest(&self) -> Result<bool> {
        let current = self.current().await?;
        Ok(self.hooks.latest(&current))
    }

    /// Reads the current epoch (0 if absent, spec §3).
    pub async fn epoch(&self) -> Result<u64> {
        let key = keys::epoch(&self.name);
        let value = self
            .coordinator
            .get_counter(&key)
            .await
            .map_err(|e| Error::coordinator(&self.name, e))?;
        Ok(value.max(0) as u64)
    }

    /// Returns true iff no rollback has occurred since `observed_epoch` was
    /// issued (spec §4.6).
    pub async fn validate(&self, observed_epoch: u64) -> Result<bool> {
        Ok(self.epoch().await? == observed_epoch)
    }

    /// Administrative escape hatch (spec §4.8): deletes the cursor, the lock
    /// key, the live-task list, the retry queue, and the epoch counter.
    /// Does not clear shadow keys exhaustively — they expire by TTL. Callers
    /// must ensure no instance is concurrently running.
    pub async fn reset(&self) -> Result<()> {
        let key = keys::cursor(&self.name);
        self.kv
            .delete(&key)
            .await
            .map_err(|e| Error::coordinator(&self.name, e))?;
        let keys_to_delete = vec![
            keys::cursor_lock(&self.name),
            keys::concurrency_list(&self.name),
            keys::failed_list(&self.name),
            keys::epoch(&self.name),
        ];
        self.coordinator
            .delete(&keys_to_delete)
            .await
            .map_err(|e| Error::coordinator(&self.name, e))
    }

    /// Scoped cursor-lock acquisition (spec §9, "Scoped resource
    /// acquisition"): acquire, run `f`, then release on every exit path —
    /// success or error. No user callback code runs in here; only the
    /// lightweight, contractually-pure `step`/`latest`/`on_rollback` hooks
    /// do, bounded by the lock's ~1s TTL.
    pub(crate) async fn with_cursor_lock<F, Fut, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<R>>,
    {
        let lock_key = keys::cursor_lock(&self.name);
        let token = self
            .coordinator
            .try_acquire_mutex(&lock_key, self.config.cursor_lock_ttl(), self.config.cursor_lock_wait_budget())
            .await
            .map_err(|e| Error::coordinator(&self.name, e))?
            .ok_or_else(|| Error::lock_unavailable(&self.name, "cursor lock wait budget exhausted"))?;

        let result = f().await;

        if let Err(e) = self.coordinator.release_mutex(&lock_key, &token).await {
            tracing::error!(indexer = %self.name, error = %e, "failed to release cursor lock");
        }

        result
    }
}
