// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use cursorflow_core::IndexerConfig;
use serde::{Deserialize, Serialize};

/// Top-level YAML configuration for the demo binary: where to reach Redis
/// and the `IndexerConfig` to run against it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    pub redis_url: String,
    pub indexer: IndexerConfig,
    /// Starting cursor value used only when the store has never seen this
    /// indexer name before.
    #[serde(default)]
    pub initial_version: u64,
}
