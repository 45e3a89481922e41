// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use super::{CursorValue, Indexer};
use crate::{
    error::{Error, Result},
    metrics,
};
use std::future::Future;

/// Options accepted by `consume` (spec §4.7). `retry` defaults to `true`.
#[derive(Clone, Copy, Debug)]
pub struct ConsumeOptions {
    pub retry: bool,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self { retry: true }
    }
}

/// What `consume` actually did on this invocation. Admission rejection and
/// reaching the terminal predicate are normal "no dispatch this tick"
/// outcomes, not errors (spec §7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome<T> {
    Dispatched { start: T, ended: T, epoch: u64 },
    AdmissionRejected,
    ReachedLatest,
}

enum Claim<T> {
    Fresh { start: T, ended: T, epoch: u64 },
    Retry { start: T, ended: T, epoch: u64 },
}

impl<T: CursorValue> Indexer<T> {
    /// Orchestrates admission, retry-first claim or atomic claim, occupy,
    /// the user callback, and release (spec §4.7). `release` runs on every
    /// exit path so accounting is never skewed by a thrown callback error.
    pub async fn consume<F, Fut>(&self, callback: F, opts: ConsumeOptions) -> Result<ConsumeOutcome<T>>
    where
        F: FnOnce(T, T, u64) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        if self.admission_blocked().await? {
            metrics::ADMISSION_REJECTED_TOTAL
                .with_label_values(&[self.name()])
                .inc();
            return Ok(ConsumeOutcome::AdmissionRejected);
        }

        let claim = match self.next_claim().await? {
            Some(claim) => claim,
            None => return Ok(ConsumeOutcome::ReachedLatest),
        };

        let (start, ended, epoch, lane) = match claim {
            Claim::Fresh { start, ended, epoch } => (start, ended, epoch, "fresh"),
            Claim::Retry { start, ended, epoch } => (start, ended, epoch, "retry"),
        };
        metrics::CLAIMS_TOTAL
            .with_label_values(&[self.name(), lane])
            .inc();

        self.occupy(&start).await;

        match callback(start.clone(), ended.clone(), epoch).await {
            Ok(()) => {
                self.release(&start).await;
                Ok(ConsumeOutcome::Dispatched { start, ended, epoch })
            },
            Err(source) => {
                let current_epoch = self.epoch().await?;
                if current_epoch != epoch {
                    tracing::warn!(
                        indexer = self.name(),
                        claimed_epoch = epoch,
                        current_epoch,
                        "callback failed after a rollback invalidated its epoch; dropping result"
                    );
                } else if opts.retry {
                    if let Err(e) = self.fail(&start).await {
                        tracing::error!(indexer = self.name(), error = %e, "failed to enqueue retry");
                    }
                }
                self.release(&start).await;
                Err(Error::Callback {
                    indexer: self.name().to_string(),
                    source,
                })
            },
        }
    }

    /// Retry-first claim (spec §4.7 step 2): a pending retry is replayed
    /// without the terminal-predicate check; otherwise fall through to
    /// `atomic()`, returning `None` to mean "reached latest, nothing to
    /// dispatch".
    async fn next_claim(&self) -> Result<Option<Claim<T>>> {
        if let Some(start) = self.failed().await? {
            let ended = self.step(Some(start.clone())).await?;
            let epoch = self.epoch().await?;
            return Ok(Some(Claim::Retry { start, ended, epoch }));
        }

        match self.atomic().await {
            Ok(claim) => Ok(Some(Claim::Fresh {
                start: claim.start,
                ended: claim.ended,
                epoch: claim.epoch,
            })),
            Err(Error::ReachedLatest { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::IndexerConfig, engine::IndexerBuilder, hooks::Hooks, testing::InMemoryCoordinator};
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    fn indexer(initial: u64) -> crate::engine::Indexer<u64> {
        let config = IndexerConfig::new("orders");
        let hooks = Hooks::new(|c: &u64| c + 10).with_initial(move || initial);
        IndexerBuilder::new(config, hooks)
            .with_coordinator(Arc::new(InMemoryCoordinator::new()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn two_parallel_consumers_partition_the_interval_space() {
        let indexer = Arc::new(indexer(0));
        let seen: Arc<std::sync::Mutex<Vec<(u64, u64)>>> = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let indexer = indexer.clone();
            let seen = seen.clone();
            handles.push(tokio::spawn(async move {
                indexer
                    .consume(
                        |start, ended, _epoch| {
                            let seen = seen.clone();
                            async move {
                                seen.lock().unwrap().push((start, ended));
                                Ok(())
                            }
                        },
                        ConsumeOptions::default(),
                    )
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut pairs = seen.lock().unwrap().clone();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 10), (10, 20)]);
        assert_eq!(indexer.current().await.unwrap(), 20);
        assert!(!indexer.admission_blocked().await.unwrap());
    }

    #[tokio::test]
    async fn admission_cap_rejects_without_touching_the_cursor() {
        let config = IndexerConfig::new("orders").with_concurrency(1);
        let hooks = Hooks::new(|c: &u64| c + 1).with_initial(|| 0u64);
        let indexer = IndexerBuilder::new(config, hooks)
            .with_coordinator(Arc::new(InMemoryCoordinator::new()))
            .build()
            .unwrap();

        indexer.occupy(&0u64).await;

        let outcome = indexer
            .consume(
                |_s, _e, _ep| async { Ok(()) },
                ConsumeOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, ConsumeOutcome::AdmissionRejected);
        assert_eq!(indexer.current().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn callback_error_with_retry_disabled_leaves_retry_queue_empty() {
        let indexer = indexer(0);
        let err = indexer
            .consume(
                |_s, _e, _ep| async { Err(anyhow::anyhow!("boom")) },
                ConsumeOptions { retry: false },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Callback { .. }));
        assert_eq!(indexer.failed().await.unwrap(), None);
        assert!(!indexer.admission_blocked().await.unwrap());
    }

    #[tokio::test]
    async fn callback_error_with_retry_enabled_enqueues_the_start() {
        let indexer = indexer(0);
        let _ = indexer
            .consume(
                |_s, _e, _ep| async { Err(anyhow::anyhow!("boom")) },
                ConsumeOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(indexer.failed().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn callback_error_with_stale_epoch_skips_retry_and_still_rethrows() {
        let coordinator = Arc::new(InMemoryCoordinator::new());
        let build = || {
            let config = IndexerConfig::new("orders");
            let hooks = Hooks::new(|c: &u64| c + 1).with_initial(|| 0u64);
            IndexerBuilder::new(config, hooks)
                .with_coordinator(coordinator.clone())
                .build()
                .unwrap()
        };
        let indexer = build();
        // A second handle onto the same backing store models a concurrent
        // caller who rolls back the cursor while our callback is in flight.
        let rolled_back_by = build();
        let calls = Arc::new(AtomicU64::new(0));
        let calls_clone = calls.clone();

        let err = indexer
            .consume(
                |_s, _e, _ep| {
                    let calls = calls_clone.clone();
                    let rolled_back_by = &rolled_back_by;
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        rolled_back_by.rollback(99).await.unwrap();
                        Err(anyhow::anyhow!("boom"))
                    }
                },
                ConsumeOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Callback { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The rollback invalidated the claimed epoch, so the failed start
        // must not have been requeued.
        assert_eq!(indexer.failed().await.unwrap(), None);
        assert_eq!(indexer.current().await.unwrap(), 99);
    }

    #[tokio::test]
    async fn retry_replay_skips_the_latest_check() {
        let config = IndexerConfig::new("orders");
        let hooks = Hooks::new(|c: &u64| c + 1)
            .with_initial(|| 0u64)
            .with_latest(|c: &u64| *c >= 1);
        let indexer = IndexerBuilder::new(config, hooks)
            .with_coordinator(Arc::new(InMemoryCoordinator::new()))
            .build()
            .unwrap();

        // Cursor is already at its terminal boundary.
        indexer.next(Some(1)).await.unwrap();
        indexer.fail(&5u64).await.unwrap();

        let outcome = indexer
            .consume(|_s, _e, _ep| async { Ok(()) }, ConsumeOptions::default())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ConsumeOutcome::Dispatched { start: 5, ended: 6, epoch: 0 }
        );
    }
}
