//! Sentinel Interceptor
//!
//! Row-level trip-wire on the executor's row-production path:
//! - **Hook Chain**: installs the interceptor in place of the host's executor run
//! - **Execution Loop**: pulls rows, sends them on, enforces tuple counts
//! - **Matcher**: prefix check of the watched column against the marker
//! - **Abort Dispatcher**: statement- or connection-scoped abort on a match

pub mod abort;
pub mod executor;
pub mod hooks;
pub mod matcher;
pub mod parallel;
pub mod types;

pub use abort::AbortDispatcher;
pub use executor::{ExecutionLoop, SentinelExecutor, StandardExecutor};
pub use hooks::{ExecutorRunHook, HookChain, HookHandle, HookRef};
pub use parallel::ParallelModeState;
pub use types::*;
