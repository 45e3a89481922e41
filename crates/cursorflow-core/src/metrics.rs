// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Metrics emitted by the engine, labeled by indexer name. Shape mirrors
//! `indexer-grpc-utils::counters`: `once_cell::Lazy` statics registered with
//! `prometheus`'s `register_*_vec!` macros.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};

pub static CLAIMS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cursorflow_claims_total",
        "Number of intervals claimed via atomic() or the retry queue",
        &["indexer", "lane"]
    )
    .unwrap()
});

pub static ADMISSION_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cursorflow_admission_rejected_total",
        "Number of consume() calls that returned without dispatching due to the concurrency cap",
        &["indexer"]
    )
    .unwrap()
});

pub static ZOMBIES_REAPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cursorflow_zombies_reaped_total",
        "Number of live-task entries migrated to the retry queue by cleanup()",
        &["indexer"]
    )
    .unwrap()
});

pub static RETRIES_ENQUEUED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cursorflow_retries_enqueued_total",
        "Number of starts pushed onto the retry queue by fail()",
        &["indexer"]
    )
    .unwrap()
});

pub static ROLLBACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "cursorflow_rollbacks_total",
        "Number of completed rollback() calls",
        &["indexer"]
    )
    .unwrap()
});

pub static CURRENT_EPOCH: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "cursorflow_current_epoch",
        "Epoch observed after the most recent rollback",
        &["indexer"]
    )
    .unwrap()
});

pub static LIVE_TASKS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "cursorflow_live_tasks",
        "Live-task list length observed at the last admission check",
        &["indexer"]
    )
    .unwrap()
});
