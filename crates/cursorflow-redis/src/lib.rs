// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Redis implementation of `cursorflow_core::coordinator::Coordinator`,
//! the canonical shared-coordinator backend referenced throughout
//! `cursorflow-core`'s documentation.

mod coordinator;
mod kv;

pub use coordinator::RedisCoordinator;
pub use kv::RedisKvStore;
