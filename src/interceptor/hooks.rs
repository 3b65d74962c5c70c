// SPDX-License-Identifier: Apache-2.0

//! Hook Chain
//!
//! The host's executor-run hook point. One slot holds the currently
//! registered hook; each [`HookChain::install`] hands back a handle that
//! remembers what was registered before it, and [`HookChain::uninstall`]
//! puts exactly that back.
//!
//! Install and uninstall happen at extension load/unload and must be
//! serialized by the host. Uninstalls are expected in LIFO order; the chain
//! does not enforce it.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use sentinel_core::{ExecutorResult, ScanDirection};

use super::executor::StandardExecutor;
use super::parallel::ParallelModeState;
use super::types::{QueryDesc, StatementSummary};

/// A replacement for the host's executor run
#[async_trait]
pub trait ExecutorRunHook: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Runs `desc` in `direction`, processing at most `count` tuples
    /// (0 = all of them)
    async fn run(
        &self,
        desc: &mut QueryDesc,
        direction: ScanDirection,
        count: u64,
    ) -> ExecutorResult<StatementSummary>;
}

pub type HookRef = Arc<dyn ExecutorRunHook>;

/// Proof of an install, carrying the hook it displaced
#[must_use = "dropping the handle makes the previous hook unrecoverable"]
pub struct HookHandle {
    installed: HookRef,
    previous: Option<HookRef>,
}

impl HookHandle {
    pub fn installed(&self) -> &HookRef {
        &self.installed
    }

    pub fn previous(&self) -> Option<&HookRef> {
        self.previous.as_ref()
    }
}

impl std::fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookHandle")
            .field("installed", &self.installed.name())
            .field("previous", &self.previous.as_ref().map(|h| h.name()))
            .finish()
    }
}

/// Executor-run hook slot with save/restore semantics
pub struct HookChain {
    current: RwLock<Option<HookRef>>,
    standard: HookRef,
}

static GLOBAL_CHAIN: OnceLock<Arc<HookChain>> = OnceLock::new();

impl HookChain {
    /// Creates an empty chain that falls back to `standard` when no hook is
    /// registered
    pub fn new(standard: HookRef) -> Self {
        Self {
            current: RwLock::new(None),
            standard,
        }
    }

    /// The process-wide chain, created on first use
    pub fn global() -> Arc<HookChain> {
        GLOBAL_CHAIN.get_or_init(|| Arc::new(HookChain::default())).clone()
    }

    /// Registers `hook`, remembering the hook it replaces
    pub fn install(&self, hook: HookRef) -> HookHandle {
        let mut current = self.current.write();

        if let Some(existing) = current.as_ref() {
            if Arc::ptr_eq(existing, &hook) {
                warn!(hook = hook.name(), "Executor hook is already installed");
            }
        }

        let previous = current.replace(Arc::clone(&hook));
        info!(
            hook = hook.name(),
            previous = previous.as_ref().map(|h| h.name()).unwrap_or("none"),
            "Executor hook installed"
        );

        HookHandle {
            installed: hook,
            previous,
        }
    }

    /// Restores the hook saved by the matching install, whatever is
    /// registered right now
    pub fn uninstall(&self, handle: HookHandle) {
        let mut current = self.current.write();

        let still_current = current
            .as_ref()
            .map(|h| Arc::ptr_eq(h, &handle.installed))
            .unwrap_or(false);
        if !still_current {
            debug!(
                hook = handle.installed.name(),
                "Uninstalling a hook that is no longer current"
            );
        }

        *current = handle.previous;
        info!(hook = handle.installed.name(), "Executor hook uninstalled");
    }

    /// The registered hook, if any
    pub fn current(&self) -> Option<HookRef> {
        self.current.read().clone()
    }

    pub fn is_hooked(&self) -> bool {
        self.current.read().is_some()
    }

    /// Runs a statement through the registered hook, or through the
    /// standard executor when nothing is registered
    pub async fn run(
        &self,
        desc: &mut QueryDesc,
        direction: ScanDirection,
        count: u64,
    ) -> ExecutorResult<StatementSummary> {
        let hook = self.current().unwrap_or_else(|| Arc::clone(&self.standard));
        hook.run(desc, direction, count).await
    }
}

impl Default for HookChain {
    fn default() -> Self {
        Self::new(Arc::new(StandardExecutor::new(Arc::new(ParallelModeState::new()))))
    }
}
