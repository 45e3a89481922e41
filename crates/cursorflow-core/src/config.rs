// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_RUNNING_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RETRY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONCURRENCY_TIMEOUT_MULTIPLIER: u64 = 2;
const CURSOR_LOCK_TTL: Duration = Duration::from_secs(1);
const CURSOR_LOCK_WAIT_BUDGET: Duration = Duration::from_secs(1);

fn default_running_timeout_secs() -> u64 {
    DEFAULT_RUNNING_TIMEOUT_SECS
}

fn default_retry_timeout_secs() -> u64 {
    DEFAULT_RETRY_TIMEOUT_SECS
}

/// Recognized configuration options (spec §6.5).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    /// Unique indexer identifier; used as the prefix of every coordinator
    /// key this indexer touches.
    pub name: String,

    /// Global admission cap. `None` disables admission control entirely.
    #[serde(default)]
    pub concurrency: Option<u64>,

    /// Shadow TTL in seconds; governs the zombie boundary.
    #[serde(default = "default_running_timeout_secs")]
    pub running_timeout_secs: u64,

    /// Retry-queue key TTL in seconds.
    #[serde(default = "default_retry_timeout_secs")]
    pub retry_timeout_secs: u64,

    /// Live-task list TTL in seconds. Defaults to `2 * running_timeout_secs`
    /// when unset, matching spec.md's table.
    #[serde(default)]
    pub concurrency_timeout_secs: Option<u64>,
}

impl IndexerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            concurrency: None,
            running_timeout_secs: DEFAULT_RUNNING_TIMEOUT_SECS,
            retry_timeout_secs: DEFAULT_RETRY_TIMEOUT_SECS,
            concurrency_timeout_secs: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: u64) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_running_timeout_secs(mut self, secs: u64) -> Self {
        self.running_timeout_secs = secs;
        self
    }

    pub fn with_retry_timeout_secs(mut self, secs: u64) -> Self {
        self.retry_timeout_secs = secs;
        self
    }

    pub fn with_concurrency_timeout_secs(mut self, secs: u64) -> Self {
        self.concurrency_timeout_secs = Some(secs);
        self
    }

    pub fn running_timeout(&self) -> Duration {
        Duration::from_secs(self.running_timeout_secs)
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_secs)
    }

    pub fn concurrency_timeout(&self) -> Duration {
        Duration::from_secs(
            self.concurrency_timeout_secs
                .unwrap_or(self.running_timeout_secs * DEFAULT_CONCURRENCY_TIMEOUT_MULTIPLIER),
        )
    }

    pub fn cursor_lock_ttl(&self) -> Duration {
        CURSOR_LOCK_TTL
    }

    pub fn cursor_lock_wait_budget(&self) -> Duration {
        CURSOR_LOCK_WAIT_BUDGET
    }
}
