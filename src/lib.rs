// Sentinel Guard - row-level trip-wire for query executors
// Core library

pub mod extension;
pub mod interceptor;
pub mod metrics;
pub mod observability;
pub mod session;
pub mod testing;

pub use extension::SentinelExtension;
pub use observability::LogSettings;
pub use interceptor::{
    AbortDispatcher, ExecutionContext, ExecutorRunHook, HookChain, HookHandle, LoopExit,
    QueryDesc, SentinelExecutor, StandardExecutor, StatementSummary,
};
pub use session::{Connection, SessionError, SessionId, SessionResult};

pub use sentinel_core::{
    AbortScope, ConfigError, Datum, ExecutorError, OperationKind, RelationId, Row, ScanDirection,
    SentinelConfig,
};
