// SPDX-License-Identifier: Apache-2.0

//! Interceptor Types
//!
//! Statement-level types passed through the executor hook.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sentinel_core::{OperationKind, PlanSource, ProjectionFilter, RowSink, ScanDirection};

/// Unique identifier for a statement run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementId(pub Uuid);

impl StatementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StatementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the executor needs to run one planned statement
pub struct QueryDesc {
    pub statement_id: StatementId,
    pub operation: OperationKind,
    /// Whether a modifying statement carries a RETURNING list
    pub has_returning: bool,
    pub plan: Box<dyn PlanSource>,
    pub dest: Box<dyn RowSink>,
    /// Strips junk columns before rows are sent or inspected
    pub junk_filter: Option<Box<dyn ProjectionFilter>>,
    /// Measure the total runtime of the statement
    pub instrument: bool,
}

impl QueryDesc {
    pub fn new(operation: OperationKind, plan: Box<dyn PlanSource>, dest: Box<dyn RowSink>) -> Self {
        Self {
            statement_id: StatementId::new(),
            operation,
            has_returning: false,
            plan,
            dest,
            junk_filter: None,
            instrument: false,
        }
    }

    pub fn with_returning(mut self) -> Self {
        self.has_returning = true;
        self
    }

    pub fn with_junk_filter(mut self, filter: Box<dyn ProjectionFilter>) -> Self {
        self.junk_filter = Some(filter);
        self
    }

    pub fn with_instrumentation(mut self) -> Self {
        self.instrument = true;
        self
    }

    /// Rows go to the destination for reads and for RETURNING statements
    pub fn sends_tuples(&self) -> bool {
        self.operation == OperationKind::Select || self.has_returning
    }
}

impl std::fmt::Debug for QueryDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDesc")
            .field("statement_id", &self.statement_id)
            .field("operation", &self.operation)
            .field("has_returning", &self.has_returning)
            .field("junk_filter", &self.junk_filter.is_some())
            .field("instrument", &self.instrument)
            .finish()
    }
}

/// Per-statement execution state.
///
/// Created when the statement starts running and dropped when it finishes.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub direction: ScanDirection,
    /// Maximum number of tuples to process (0 = no limit)
    pub row_limit: u64,
    /// Rows counted for a read statement
    pub processed: u64,
    pub operation: OperationKind,
}

impl ExecutionContext {
    pub fn new(direction: ScanDirection, row_limit: u64, operation: OperationKind) -> Self {
        Self {
            direction,
            row_limit,
            processed: 0,
            operation,
        }
    }
}

/// Why the execution loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopExit {
    /// The plan ran out of rows
    Exhausted,
    /// The requested tuple count was reached
    LimitReached,
    /// The destination stopped accepting rows
    SinkRejected,
}

/// Outcome of a statement that ran to completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementSummary {
    pub statement_id: StatementId,
    pub operation: OperationKind,
    pub processed: u64,
    /// `None` when the plan was not run (no-movement direction)
    pub exit: Option<LoopExit>,
    /// Total runtime, when instrumentation was requested
    #[serde(default)]
    pub total_time: Option<Duration>,
}
