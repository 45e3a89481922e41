// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Property tests for the invariants that must hold for any `Indexer<T>`
//! regardless of the caller's `step`/`latest` hooks: claims tile the value
//! space without gaps or overlaps, the retry queue is FIFO under arbitrary
//! interleavings, and a rollback always invalidates every epoch issued
//! before it.

use crate::{config::IndexerConfig, engine::IndexerBuilder, hooks::Hooks, testing::InMemoryCoordinator};
use proptest::prelude::*;
use std::sync::Arc;

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(fut)
}

fn counting_indexer() -> crate::engine::Indexer<u64> {
    let config = IndexerConfig::new("orders");
    let hooks = Hooks::new(|c: &u64| c + 1).with_initial(|| 0u64);
    IndexerBuilder::new(config, hooks)
        .with_coordinator(Arc::new(InMemoryCoordinator::new()))
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        .. ProptestConfig::default()
    })]

    /// `n` sequential `atomic()` claims must tile `[0, n)` with no gap and no
    /// overlap: each claim's `start` equals the previous claim's `ended`.
    #[test]
    fn sequential_claims_tile_the_value_space_without_gaps(n in 1u64..40) {
        block_on(async {
            let indexer = counting_indexer();
            let mut previous_ended = 0u64;
            for _ in 0..n {
                let claim = indexer.atomic().await.unwrap();
                prop_assert_eq!(claim.start, previous_ended);
                prop_assert_eq!(claim.ended, claim.start + 1);
                previous_ended = claim.ended;
            }
            prop_assert_eq!(indexer.current().await.unwrap(), n);
            Ok(())
        })?;
    }

    /// Enqueuing `starts` onto the retry queue and then dequeuing the same
    /// count must reproduce the original order (spec §4.4: FIFO), regardless
    /// of how many entries were pushed.
    #[test]
    fn retry_queue_preserves_fifo_order(starts in prop::collection::vec(0u64..1000, 0..30)) {
        block_on(async {
            let indexer = counting_indexer();
            for start in &starts {
                indexer.fail(start).await.unwrap();
            }
            let mut drained = Vec::new();
            while let Some(start) = indexer.failed().await.unwrap() {
                drained.push(start);
            }
            prop_assert_eq!(drained, starts);
            Ok(())
        })?;
    }

    /// A committed `rollback` always invalidates every epoch token issued
    /// before it and validates the epoch it leaves behind, no matter how
    /// many prior rollbacks already ran.
    #[test]
    fn rollback_invalidates_every_prior_epoch(prior_rollbacks in 0u32..6, target in 0u64..100) {
        block_on(async {
            let indexer = counting_indexer();
            let mut observed_epochs = Vec::new();
            for i in 0..prior_rollbacks {
                observed_epochs.push(indexer.epoch().await.unwrap());
                indexer.rollback(i as u64).await.unwrap();
            }
            let epoch_before_final = indexer.epoch().await.unwrap();
            observed_epochs.push(epoch_before_final);

            indexer.rollback(target).await.unwrap();
            let final_epoch = indexer.epoch().await.unwrap();

            for epoch in observed_epochs {
                prop_assert!(!indexer.validate(epoch).await.unwrap());
            }
            prop_assert!(indexer.validate(final_epoch).await.unwrap());
            prop_assert_eq!(indexer.current().await.unwrap(), target);
            Ok(())
        })?;
    }

    /// `occupy`/`release` pairs never leave admission permanently blocked:
    /// after an equal number of each, in any order that never releases more
    /// than has been occupied, the live count returns to zero.
    #[test]
    fn occupy_release_pairs_always_balance(count in 1u64..20) {
        block_on(async {
            let config = IndexerConfig::new("orders").with_concurrency(count);
            let hooks = Hooks::new(|c: &u64| c + 1).with_initial(|| 0u64);
            let indexer = IndexerBuilder::new(config, hooks)
                .with_coordinator(Arc::new(InMemoryCoordinator::new()))
                .build()
                .unwrap();

            for start in 0..count {
                indexer.occupy(&start).await;
            }
            prop_assert!(indexer.admission_blocked().await.unwrap());
            for start in 0..count {
                indexer.release(&start).await;
            }
            prop_assert!(!indexer.admission_blocked().await.unwrap());
            Ok(())
        })?;
    }
}
