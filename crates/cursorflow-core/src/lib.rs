// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Coordination engine for advancing named, monotonic cursors across many
//! worker processes and dispatching each half-open interval `[start, ended)`
//! exactly once.
//!
//! An `Indexer<T>` owns its [`IndexerConfig`], its [`Hooks`], and the two
//! abstract collaborators it needs to coordinate with the rest of the
//! fleet: a [`KvStore`] for the durable cursor value, and a [`Coordinator`]
//! for the mutex, counters, and lists shared across instances. Neither
//! collaborator is assumed to be Redis at this layer — `cursorflow-redis`
//! supplies the canonical `Coordinator` implementation.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod hooks;
mod keys;
pub mod kv;
pub mod metrics;
pub mod testing;

pub use config::IndexerConfig;
pub use coordinator::{Coordinator, MutexToken};
pub use engine::{AtomicClaim, ConsumeOptions, ConsumeOutcome, CursorValue, Indexer, IndexerBuilder};
pub use error::{Error, Result};
pub use hooks::Hooks;
pub use kv::{InMemoryKvStore, KvStore};
