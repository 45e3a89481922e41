// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

//! Caller-provided user hooks (spec §6.1). The source binds these via
//! decorator metadata on a class; here each indexer is a value holding its
//! hooks directly, built through `IndexerBuilder` (spec §9, "model each
//! indexer as a value").

use futures::future::BoxFuture;
use std::sync::Arc;

type StepFn<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;
type LatestFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type InitialFn<T> = Arc<dyn Fn() -> T + Send + Sync>;
type RollbackFn<T> = Arc<dyn Fn(T, T) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// The hooks a caller supplies for one indexer. `step` is required; the rest
/// default to the behavior spec.md documents for an absent hook.
#[derive(Clone)]
pub struct Hooks<T> {
    pub(crate) step: StepFn<T>,
    pub(crate) latest: Option<LatestFn<T>>,
    pub(crate) initial: Option<InitialFn<T>>,
    pub(crate) on_rollback: Option<RollbackFn<T>>,
}

impl<T> Hooks<T> {
    pub fn new(step: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        Self {
            step: Arc::new(step),
            latest: None,
            initial: None,
            on_rollback: None,
        }
    }

    /// Strictly-increasing, pure: `step(current) -> next`. Contract
    /// violations (non-determinism, side effects) produce undefined
    /// dispatch ordering, not an engine error.
    pub fn with_step(mut self, step: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        self.step = Arc::new(step);
        self
    }

    /// Terminal predicate; absent predicate means "never terminal" (spec
    /// §4.1).
    pub fn with_latest(mut self, latest: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.latest = Some(Arc::new(latest));
        self
    }

    /// Overrides the config-level `initial` constant.
    pub fn with_initial(mut self, initial: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.initial = Some(Arc::new(initial));
        self
    }

    /// Business-side cleanup invoked before the cursor pointer moves during
    /// `rollback`. A failing hook aborts the rollback: the cursor is left
    /// untouched and the epoch is not incremented.
    pub fn with_on_rollback<F>(mut self, on_rollback: F) -> Self
    where
        F: Fn(T, T) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.on_rollback = Some(Arc::new(on_rollback));
        self
    }

    pub(crate) fn step(&self, current: &T) -> T {
        (self.step)(current)
    }

    pub(crate) fn latest(&self, current: &T) -> bool {
        self.latest.as_ref().map(|f| f(current)).unwrap_or(false)
    }

    pub(crate) fn initial(&self) -> Option<T> {
        self.initial.as_ref().map(|f| f())
    }

    pub(crate) async fn on_rollback(&self, from: T, to: T) -> anyhow::Result<()>
    where
        T: Send + 'static,
    {
        match &self.on_rollback {
            Some(f) => f(from, to).await,
            None => Ok(()),
        }
    }
}
