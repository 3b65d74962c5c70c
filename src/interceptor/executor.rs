// SPDX-License-Identifier: Apache-2.0

//! Execution Loop
//!
//! Drives row production for a planned statement:
//! 1. Pull rows from the plan until it is exhausted, the tuple count is
//!    reached, or the destination stops accepting rows
//! 2. Strip junk columns and send each row to the destination
//! 3. For reads, inspect the configured column and abort on the sentinel
//!
//! [`SentinelExecutor`] is the hook installed by the extension;
//! [`StandardExecutor`] is the host's default run, used when no hook is
//! registered.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, instrument};

use sentinel_core::{
    ErrorRaiser, ExecutorResult, ParallelCoordinator, PlanSource, ProjectionFilter, Row, RowSink,
    ScanDirection, SentinelConfig,
};

use super::hooks::ExecutorRunHook;
use super::matcher;
use super::parallel::ParallelModeGuard;
use super::types::{ExecutionContext, LoopExit, QueryDesc, StatementSummary};
use crate::metrics;

/// Per-row sentinel inspection
#[derive(Clone, Copy)]
pub(crate) struct SentinelCheck<'a> {
    config: &'a SentinelConfig,
    raiser: &'a dyn ErrorRaiser,
}

impl<'a> SentinelCheck<'a> {
    pub(crate) fn new(config: &'a SentinelConfig, raiser: &'a dyn ErrorRaiser) -> Self {
        Self { config, raiser }
    }

    /// Aborts if the row comes from the watched relation and its watched
    /// column starts with the marker.
    fn inspect(&self, row: &Row) -> ExecutorResult<()> {
        if row.relation != Some(self.config.relation_id) {
            return Ok(());
        }

        let text = row.text_at(self.config.column_no);
        if matcher::matches(text.as_deref(), self.config.marker()) {
            return Err(self.raiser.raise(
                self.config.abort_scope,
                self.config.relation_id,
                self.config.column_no,
            ));
        }
        Ok(())
    }
}

/// The row-production loop for one statement
pub struct ExecutionLoop<'a> {
    check: Option<SentinelCheck<'a>>,
    parallel: &'a dyn ParallelCoordinator,
}

impl<'a> ExecutionLoop<'a> {
    /// A loop that only moves rows, without sentinel inspection
    pub fn plain(parallel: &'a dyn ParallelCoordinator) -> Self {
        Self {
            check: None,
            parallel,
        }
    }

    pub(crate) fn with_check(check: SentinelCheck<'a>, parallel: &'a dyn ParallelCoordinator) -> Self {
        Self {
            check: Some(check),
            parallel,
        }
    }

    /// Runs the plan until it stops.
    ///
    /// The plan is shut down exactly once on every normal exit. When the
    /// sentinel trips, the abort error is returned immediately and the plan
    /// is left as is: no further row is produced or sent, and shutdown is
    /// skipped. Errors from the plan or the destination propagate unchanged.
    pub async fn run(
        &self,
        ctx: &mut ExecutionContext,
        plan: &mut dyn PlanSource,
        filter: Option<&dyn ProjectionFilter>,
        forward_rows: bool,
        sink: &mut dyn RowSink,
    ) -> ExecutorResult<LoopExit> {
        let mut current_tuple_count: u64 = 0;

        // A tuple count means we may stop early, which parallel workers can't honour.
        let use_parallel_mode = ctx.row_limit == 0 && plan.parallel_mode_needed();
        let _parallel = use_parallel_mode.then(|| ParallelModeGuard::enter(self.parallel));

        let exit = loop {
            let row = match plan.next().await? {
                Some(row) => row,
                None => break LoopExit::Exhausted,
            };

            let row = match filter {
                Some(filter) => filter.apply(row),
                None => row,
            };

            if forward_rows && !sink.accept(&row).await? {
                break LoopExit::SinkRejected;
            }

            if ctx.operation.is_row_read() {
                if let Some(check) = &self.check {
                    check.inspect(&row)?;
                }
                ctx.processed += 1;
            }

            // Zero means no limit
            current_tuple_count += 1;
            if ctx.row_limit != 0 && current_tuple_count == ctx.row_limit {
                break LoopExit::LimitReached;
            }
        };

        plan.shutdown().await?;
        Ok(exit)
    }
}

/// Runs a whole statement: destination startup, the loop, destination
/// shutdown, and optional runtime instrumentation.
#[instrument(
    skip(desc, check, parallel),
    fields(statement = %desc.statement_id.0, operation = ?desc.operation)
)]
pub(crate) async fn run_statement(
    desc: &mut QueryDesc,
    direction: ScanDirection,
    count: u64,
    check: Option<SentinelCheck<'_>>,
    parallel: &dyn ParallelCoordinator,
) -> ExecutorResult<StatementSummary> {
    let started = desc.instrument.then(Instant::now);
    let mut ctx = ExecutionContext::new(direction, count, desc.operation);
    let send_tuples = desc.sends_tuples();

    if send_tuples {
        desc.dest.startup(desc.operation).await?;
    }

    let exit = if direction.is_no_movement() {
        None
    } else {
        let exec = match check {
            Some(check) => ExecutionLoop::with_check(check, parallel),
            None => ExecutionLoop::plain(parallel),
        };
        let exit = exec
            .run(
                &mut ctx,
                desc.plan.as_mut(),
                desc.junk_filter.as_deref(),
                send_tuples,
                desc.dest.as_mut(),
            )
            .await?;
        Some(exit)
    };

    if send_tuples {
        desc.dest.shutdown().await?;
    }

    let total_time = started.map(|t| t.elapsed());
    metrics::record_statement(ctx.processed, exit);
    debug!(processed = ctx.processed, exit = ?exit, "Statement finished");

    Ok(StatementSummary {
        statement_id: desc.statement_id,
        operation: desc.operation,
        processed: ctx.processed,
        exit,
        total_time,
    })
}

/// Executor hook that inspects every read row for the sentinel
pub struct SentinelExecutor {
    config: Arc<SentinelConfig>,
    raiser: Arc<dyn ErrorRaiser>,
    parallel: Arc<dyn ParallelCoordinator>,
}

impl SentinelExecutor {
    pub fn new(
        config: Arc<SentinelConfig>,
        raiser: Arc<dyn ErrorRaiser>,
        parallel: Arc<dyn ParallelCoordinator>,
    ) -> Self {
        Self {
            config,
            raiser,
            parallel,
        }
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }
}

#[async_trait]
impl ExecutorRunHook for SentinelExecutor {
    fn name(&self) -> &'static str {
        "sentinel"
    }

    async fn run(
        &self,
        desc: &mut QueryDesc,
        direction: ScanDirection,
        count: u64,
    ) -> ExecutorResult<StatementSummary> {
        let check = self
            .config
            .is_enabled()
            .then(|| SentinelCheck::new(&self.config, self.raiser.as_ref()));
        run_statement(desc, direction, count, check, self.parallel.as_ref()).await
    }
}

/// The host's default executor run, without any inspection
pub struct StandardExecutor {
    parallel: Arc<dyn ParallelCoordinator>,
}

impl StandardExecutor {
    pub fn new(parallel: Arc<dyn ParallelCoordinator>) -> Self {
        Self { parallel }
    }
}

#[async_trait]
impl ExecutorRunHook for StandardExecutor {
    fn name(&self) -> &'static str {
        "standard"
    }

    async fn run(
        &self,
        desc: &mut QueryDesc,
        direction: ScanDirection,
        count: u64,
    ) -> ExecutorResult<StatementSummary> {
        run_statement(desc, direction, count, None, self.parallel.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::abort::AbortDispatcher;
    use crate::interceptor::parallel::ParallelModeState;
    use crate::testing::{CollectingSink, ProbeCounters, VecPlan};
    use sentinel_core::{AbortScope, Datum, OperationKind, RelationId};

    const WATCHED: RelationId = RelationId(16384);

    fn config() -> SentinelConfig {
        SentinelConfig::new(WATCHED, 2, "SENTINEL").with_abort_scope(AbortScope::StatementOnly)
    }

    fn watched_row(id: i64, secret: &str) -> Row {
        Row::from_relation(WATCHED, vec![Datum::Int(id), Datum::from(secret)])
    }

    #[tokio::test]
    async fn test_trip_wire_stops_before_next_row() {
        let counters = ProbeCounters::new();
        let mut plan = VecPlan::new(
            vec![
                watched_row(1, "alpha"),
                watched_row(2, "SENTINEL-X"),
                watched_row(3, "gamma"),
            ],
            counters.clone(),
        );
        let mut sink = CollectingSink::new(counters.clone());
        let config = config();
        let raiser = AbortDispatcher::new();
        let parallel = ParallelModeState::new();
        let exec = ExecutionLoop::with_check(SentinelCheck::new(&config, &raiser), &parallel);
        let mut ctx = ExecutionContext::new(ScanDirection::Forward, 0, OperationKind::Select);

        let err = exec
            .run(&mut ctx, &mut plan, None, true, &mut sink)
            .await
            .unwrap_err();

        assert_eq!(err.abort_scope(), Some(AbortScope::StatementOnly));
        assert_eq!(counters.rows_produced(), 2, "row 3 must never be produced");
        // The matching row itself was already sent before inspection.
        assert_eq!(sink.rows(), vec![watched_row(1, "alpha"), watched_row(2, "SENTINEL-X")]);
        assert_eq!(ctx.processed, 1);
        assert_eq!(counters.shutdowns(), 0, "abort skips plan shutdown");
    }

    #[tokio::test]
    async fn test_other_relations_never_trip() {
        let counters = ProbeCounters::new();
        let rows = vec![
            Row::from_relation(RelationId(99), vec![Datum::Int(1), "SENTINEL".into()]),
            Row::new(vec![Datum::Int(2), "SENTINEL".into()]),
        ];
        let mut plan = VecPlan::new(rows, counters.clone());
        let mut sink = CollectingSink::new(counters.clone());
        let config = config();
        let raiser = AbortDispatcher::new();
        let parallel = ParallelModeState::new();
        let exec = ExecutionLoop::with_check(SentinelCheck::new(&config, &raiser), &parallel);
        let mut ctx = ExecutionContext::new(ScanDirection::Forward, 0, OperationKind::Select);

        let exit = exec.run(&mut ctx, &mut plan, None, true, &mut sink).await.unwrap();

        assert_eq!(exit, LoopExit::Exhausted);
        assert_eq!(sink.rows().len(), 2);
        assert_eq!(ctx.processed, 2);
        assert_eq!(counters.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_row_limit_stops_and_shuts_down_once() {
        let counters = ProbeCounters::new();
        let rows = (1..=5).map(|i| watched_row(i, "plain")).collect();
        let mut plan = VecPlan::new(rows, counters.clone());
        let mut sink = CollectingSink::new(counters.clone());
        let parallel = ParallelModeState::new();
        let exec = ExecutionLoop::plain(&parallel);
        let mut ctx = ExecutionContext::new(ScanDirection::Forward, 2, OperationKind::Select);

        let exit = exec.run(&mut ctx, &mut plan, None, true, &mut sink).await.unwrap();

        assert_eq!(exit, LoopExit::LimitReached);
        assert_eq!(sink.rows().len(), 2);
        assert_eq!(counters.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_sink_rejection_is_not_an_error() {
        let counters = ProbeCounters::new();
        let rows = (1..=5).map(|i| watched_row(i, "plain")).collect();
        let mut plan = VecPlan::new(rows, counters.clone());
        let mut sink = CollectingSink::new(counters.clone()).reject_on_call(3);
        let config = config();
        let raiser = AbortDispatcher::new();
        let parallel = ParallelModeState::new();
        let exec = ExecutionLoop::with_check(SentinelCheck::new(&config, &raiser), &parallel);
        let mut ctx = ExecutionContext::new(ScanDirection::Forward, 0, OperationKind::Select);

        let exit = exec.run(&mut ctx, &mut plan, None, true, &mut sink).await.unwrap();

        assert_eq!(exit, LoopExit::SinkRejected);
        assert_eq!(sink.rows().len(), 2);
        assert_eq!(counters.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_writes_are_not_inspected() {
        let counters = ProbeCounters::new();
        let mut plan = VecPlan::new(vec![watched_row(1, "SENTINEL")], counters.clone());
        let mut sink = CollectingSink::new(counters.clone());
        let config = config();
        let raiser = AbortDispatcher::new();
        let parallel = ParallelModeState::new();
        let exec = ExecutionLoop::with_check(SentinelCheck::new(&config, &raiser), &parallel);
        let mut ctx = ExecutionContext::new(ScanDirection::Forward, 0, OperationKind::Update);

        let exit = exec.run(&mut ctx, &mut plan, None, false, &mut sink).await.unwrap();

        assert_eq!(exit, LoopExit::Exhausted);
        assert_eq!(ctx.processed, 0);
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn test_parallel_mode_bracket() {
        let counters = ProbeCounters::new();
        let rows = (1..=3).map(|i| watched_row(i, "plain")).collect();
        let mut plan = VecPlan::new(rows, counters.clone()).parallel();
        let mut sink = CollectingSink::new(counters.clone());
        let parallel = ParallelModeState::new();
        let exec = ExecutionLoop::plain(&parallel);
        let mut ctx = ExecutionContext::new(ScanDirection::Forward, 0, OperationKind::Select);

        exec.run(&mut ctx, &mut plan, None, true, &mut sink).await.unwrap();

        assert_eq!(parallel.times_entered(), 1);
        assert!(!parallel.is_active());
    }

    #[tokio::test]
    async fn test_row_limit_forces_serial_execution() {
        let counters = ProbeCounters::new();
        let rows = (1..=3).map(|i| watched_row(i, "plain")).collect();
        let mut plan = VecPlan::new(rows, counters.clone()).parallel();
        let mut sink = CollectingSink::new(counters.clone());
        let parallel = ParallelModeState::new();
        let exec = ExecutionLoop::plain(&parallel);
        let mut ctx = ExecutionContext::new(ScanDirection::Forward, 2, OperationKind::Select);

        exec.run(&mut ctx, &mut plan, None, true, &mut sink).await.unwrap();

        assert_eq!(parallel.times_entered(), 0);
    }

    #[tokio::test]
    async fn test_parallel_mode_closed_on_abort() {
        let counters = ProbeCounters::new();
        let mut plan = VecPlan::new(vec![watched_row(1, "SENTINEL")], counters.clone()).parallel();
        let mut sink = CollectingSink::new(counters.clone());
        let config = config();
        let raiser = AbortDispatcher::new();
        let parallel = ParallelModeState::new();
        let exec = ExecutionLoop::with_check(SentinelCheck::new(&config, &raiser), &parallel);
        let mut ctx = ExecutionContext::new(ScanDirection::Forward, 0, OperationKind::Select);

        assert!(exec.run(&mut ctx, &mut plan, None, true, &mut sink).await.is_err());
        assert_eq!(parallel.times_entered(), 1);
        assert!(!parallel.is_active());
    }

    #[tokio::test]
    async fn test_no_movement_skips_the_plan() {
        let counters = ProbeCounters::new();
        let plan = VecPlan::new(vec![watched_row(1, "SENTINEL")], counters.clone());
        let sink = CollectingSink::new(counters.clone());
        let mut desc = QueryDesc::new(OperationKind::Select, Box::new(plan), Box::new(sink));
        let parallel = ParallelModeState::new();

        let summary = run_statement(&mut desc, ScanDirection::NoMovement, 0, None, &parallel)
            .await
            .unwrap();

        assert_eq!(summary.exit, None);
        assert_eq!(counters.rows_produced(), 0);
        assert_eq!(counters.sink_startups(), 1);
        assert_eq!(counters.sink_shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_plain_updates_do_not_start_the_destination() {
        let counters = ProbeCounters::new();
        let plan = VecPlan::new(vec![watched_row(1, "x")], counters.clone());
        let sink = CollectingSink::new(counters.clone());
        let mut desc = QueryDesc::new(OperationKind::Update, Box::new(plan), Box::new(sink))
            .with_instrumentation();
        let parallel = ParallelModeState::new();

        let summary = run_statement(&mut desc, ScanDirection::Forward, 0, None, &parallel)
            .await
            .unwrap();

        assert_eq!(summary.exit, Some(LoopExit::Exhausted));
        assert!(summary.total_time.is_some());
        assert_eq!(counters.sink_startups(), 0);
        assert_eq!(counters.rows_accepted(), 0);
    }

    #[tokio::test]
    async fn test_disabled_config_never_trips() {
        let counters = ProbeCounters::new();
        let plan = VecPlan::new(vec![watched_row(1, "SENTINEL")], counters.clone());
        let sink = CollectingSink::new(counters.clone());
        let mut desc = QueryDesc::new(OperationKind::Select, Box::new(plan), Box::new(sink));
        let hook = SentinelExecutor::new(
            Arc::new(SentinelConfig::new(WATCHED, 0, "SENTINEL")),
            Arc::new(AbortDispatcher::new()),
            Arc::new(ParallelModeState::new()),
        );

        let summary = hook.run(&mut desc, ScanDirection::Forward, 0).await.unwrap();
        assert_eq!(summary.processed, 1);
    }
}
