// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Error raised by the coordination engine.
///
/// `Callback` and `Coordinator` box the underlying error rather than modeling
/// it as a variant per failure cause: the engine does not interpret callback
/// or wire-level failures, it only routes them (see `Indexer::consume`).
#[derive(Debug, Error)]
pub enum Error {
    /// The terminal predicate (`latest`) was true at claim time. Carries the
    /// serialized cursor value it was evaluated against.
    #[error("indexer {indexer}: reached latest cursor {cursor}")]
    ReachedLatest { indexer: String, cursor: String },

    /// A required hook or config value is missing for the operation invoked.
    #[error("indexer {indexer}: misconfigured: {reason}")]
    Misconfiguration { indexer: String, reason: String },

    /// The cursor mutex could not be acquired within its wait budget.
    #[error("indexer {indexer}: lock unavailable: {reason}")]
    LockUnavailable { indexer: String, reason: String },

    /// The user-supplied `consume` callback returned an error.
    #[error("indexer {indexer}: callback failed: {source}")]
    Callback {
        indexer: String,
        #[source]
        source: anyhow::Error,
    },

    /// A wire-level failure talking to the shared coordinator or KV store.
    #[error("indexer {indexer}: coordinator error: {source}")]
    Coordinator {
        indexer: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Stable label for metrics cardinality, mirroring the
    /// `IndexerGrpcStep::get_label` convention.
    pub fn label(&self) -> &'static str {
        match self {
            Error::ReachedLatest { .. } => "reached_latest",
            Error::Misconfiguration { .. } => "misconfiguration",
            Error::LockUnavailable { .. } => "lock_unavailable",
            Error::Callback { .. } => "callback",
            Error::Coordinator { .. } => "coordinator",
        }
    }

    pub(crate) fn coordinator(indexer: &str, source: impl Into<anyhow::Error>) -> Self {
        Error::Coordinator {
            indexer: indexer.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn misconfiguration(indexer: &str, reason: impl Into<String>) -> Self {
        Error::Misconfiguration {
            indexer: indexer.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn lock_unavailable(indexer: &str, reason: impl Into<String>) -> Self {
        Error::LockUnavailable {
            indexer: indexer.to_string(),
            reason: reason.into(),
        }
    }
}
