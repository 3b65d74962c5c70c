// SPDX-License-Identifier: Apache-2.0

//! Parallel-mode bracketing

use std::sync::atomic::{AtomicU64, Ordering};

use sentinel_core::ParallelCoordinator;

/// In-process parallel-mode switch.
///
/// Tracks nesting depth and how often the mode was entered. Hosts with a
/// real worker coordinator supply their own [`ParallelCoordinator`].
#[derive(Debug, Default)]
pub struct ParallelModeState {
    depth: AtomicU64,
    entered: AtomicU64,
}

impl ParallelModeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> u64 {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn times_entered(&self) -> u64 {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }
}

impl ParallelCoordinator for ParallelModeState {
    fn enter_parallel_mode(&self) {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.entered.fetch_add(1, Ordering::SeqCst);
    }

    fn exit_parallel_mode(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1));
    }
}

/// Holds parallel mode open for the lifetime of the guard.
///
/// Dropping the guard exits parallel mode, so the bracket closes on every
/// path out of the loop, including an abort.
pub(crate) struct ParallelModeGuard<'a> {
    coordinator: &'a dyn ParallelCoordinator,
}

impl<'a> ParallelModeGuard<'a> {
    pub(crate) fn enter(coordinator: &'a dyn ParallelCoordinator) -> Self {
        coordinator.enter_parallel_mode();
        Self { coordinator }
    }
}

impl Drop for ParallelModeGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.exit_parallel_mode();
    }
}
