// SPDX-License-Identifier: Apache-2.0

//! Host capability traits
//!
//! The execution loop never reaches into host-owned execution state
//! directly. Everything it needs from the host comes through these narrow
//! interfaces, so the loop can run against an embedding engine or against
//! fakes in tests.

use async_trait::async_trait;

use crate::error::{AbortScope, ExecutorError, ExecutorResult};
use crate::types::{OperationKind, RelationId, Row};

/// Lazily produces the rows of a planned statement
#[async_trait]
pub trait PlanSource: Send {
    /// Produces the next row, or `None` once the plan is exhausted
    async fn next(&mut self) -> ExecutorResult<Option<Row>>;

    /// Lets plan nodes release resources.
    ///
    /// Must be idempotent: calling it on an already shut down plan is a no-op.
    async fn shutdown(&mut self) -> ExecutorResult<()>;

    /// Whether the planner asked for parallel worker coordination
    fn parallel_mode_needed(&self) -> bool {
        false
    }
}

/// Destination rows are sent to
#[async_trait]
pub trait RowSink: Send {
    async fn startup(&mut self, operation: OperationKind) -> ExecutorResult<()>;

    /// Receives one row.
    ///
    /// Returning `Ok(false)` means the destination has closed and no more
    /// rows can be sent. That is a normal end of stream, not an error.
    async fn accept(&mut self, row: &Row) -> ExecutorResult<bool>;

    async fn shutdown(&mut self) -> ExecutorResult<()>;
}

/// Strips internal-only (junk) columns before a row leaves the executor
pub trait ProjectionFilter: Send + Sync {
    fn apply(&self, row: Row) -> Row;
}

/// Turns a sentinel detection into the host's unwind signal.
///
/// The returned error must be propagated straight out of the execution
/// loop; nothing after the call site runs.
pub trait ErrorRaiser: Send + Sync {
    fn raise(&self, scope: AbortScope, relation_id: RelationId, column: u32) -> ExecutorError;
}

/// Host switch for parallel worker coordination
pub trait ParallelCoordinator: Send + Sync {
    fn enter_parallel_mode(&self);
    fn exit_parallel_mode(&self);
}
