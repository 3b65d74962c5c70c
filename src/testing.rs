// SPDX-License-Identifier: Apache-2.0

//! In-memory plans and destinations
//!
//! Lightweight [`PlanSource`], [`RowSink`] and [`ProjectionFilter`]
//! implementations backed by vectors. They record what happened to them in
//! shared [`ProbeCounters`], so a host can exercise the interceptor without
//! a real engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use sentinel_core::{ExecutorError, ExecutorResult, OperationKind, PlanSource, ProjectionFilter, Row, RowSink};

#[derive(Debug, Default)]
struct Counters {
    rows_produced: AtomicU64,
    plan_shutdowns: AtomicU64,
    accept_calls: AtomicU64,
    sink_startups: AtomicU64,
    sink_shutdowns: AtomicU64,
    received: Mutex<Vec<Row>>,
}

/// Shared view of what a [`VecPlan`] / [`CollectingSink`] pair did
#[derive(Debug, Clone, Default)]
pub struct ProbeCounters(Arc<Counters>);

impl ProbeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows_produced(&self) -> u64 {
        self.0.rows_produced.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> u64 {
        self.0.plan_shutdowns.load(Ordering::SeqCst)
    }

    pub fn accept_calls(&self) -> u64 {
        self.0.accept_calls.load(Ordering::SeqCst)
    }

    pub fn rows_accepted(&self) -> u64 {
        self.0.received.lock().len() as u64
    }

    pub fn sink_startups(&self) -> u64 {
        self.0.sink_startups.load(Ordering::SeqCst)
    }

    pub fn sink_shutdowns(&self) -> u64 {
        self.0.sink_shutdowns.load(Ordering::SeqCst)
    }

    /// Rows the destination accepted, in order
    pub fn received(&self) -> Vec<Row> {
        self.0.received.lock().clone()
    }
}

/// Plan that yields a fixed list of rows
pub struct VecPlan {
    rows: VecDeque<Row>,
    counters: ProbeCounters,
    parallel: bool,
    fail_after: Option<u64>,
    delay: Option<Duration>,
    shut_down: bool,
}

impl VecPlan {
    pub fn new(rows: Vec<Row>, counters: ProbeCounters) -> Self {
        Self {
            rows: rows.into(),
            counters,
            parallel: false,
            fail_after: None,
            delay: None,
            shut_down: false,
        }
    }

    /// Ask for parallel worker coordination
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Sleep before producing each row
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail with a host error once `n` rows have been produced
    pub fn fail_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }
}

#[async_trait]
impl PlanSource for VecPlan {
    async fn next(&mut self) -> ExecutorResult<Option<Row>> {
        if self.shut_down {
            return Ok(None);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_after == Some(self.counters.rows_produced()) {
            return Err(ExecutorError::host("scan failed"));
        }
        let row = self.rows.pop_front();
        if row.is_some() {
            self.counters.0.rows_produced.fetch_add(1, Ordering::SeqCst);
        }
        Ok(row)
    }

    async fn shutdown(&mut self) -> ExecutorResult<()> {
        self.shut_down = true;
        self.counters.0.plan_shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn parallel_mode_needed(&self) -> bool {
        self.parallel
    }
}

/// Destination that keeps every row it accepts
pub struct CollectingSink {
    counters: ProbeCounters,
    reject_on_call: Option<u64>,
}

impl CollectingSink {
    pub fn new(counters: ProbeCounters) -> Self {
        Self {
            counters,
            reject_on_call: None,
        }
    }

    /// Refuse the `n`th row (1-based) and everything after it
    pub fn reject_on_call(mut self, n: u64) -> Self {
        self.reject_on_call = Some(n);
        self
    }

    pub fn rows(&self) -> Vec<Row> {
        self.counters.received()
    }
}

#[async_trait]
impl RowSink for CollectingSink {
    async fn startup(&mut self, _operation: OperationKind) -> ExecutorResult<()> {
        self.counters.0.sink_startups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn accept(&mut self, row: &Row) -> ExecutorResult<bool> {
        let call = self.counters.0.accept_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.reject_on_call, Some(n) if call >= n) {
            return Ok(false);
        }
        self.counters.0.received.lock().push(row.clone());
        Ok(true)
    }

    async fn shutdown(&mut self) -> ExecutorResult<()> {
        self.counters.0.sink_shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Junk filter that keeps only the leading columns of a row
#[derive(Debug, Clone, Copy)]
pub struct KeepLeadingColumns(pub usize);

impl ProjectionFilter for KeepLeadingColumns {
    fn apply(&self, mut row: Row) -> Row {
        row.values.truncate(self.0);
        row
    }
}
