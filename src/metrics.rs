//! Lightweight in-memory interceptor metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

use sentinel_core::AbortScope;

use crate::interceptor::LoopExit;

#[derive(Default)]
struct InterceptorMetrics {
    statements: AtomicU64,
    rows_processed: AtomicU64,
    limit_stops: AtomicU64,
    sink_rejections: AtomicU64,
    detections_statement_only: AtomicU64,
    detections_connection_wide: AtomicU64,
}

static INTERCEPTOR_METRICS: OnceLock<InterceptorMetrics> = OnceLock::new();

fn metrics() -> &'static InterceptorMetrics {
    INTERCEPTOR_METRICS.get_or_init(InterceptorMetrics::default)
}

/// Records a statement that finished without an abort
pub fn record_statement(processed: u64, exit: Option<LoopExit>) {
    let metrics = metrics();
    metrics.statements.fetch_add(1, Ordering::Relaxed);
    metrics.rows_processed.fetch_add(processed, Ordering::Relaxed);
    match exit {
        Some(LoopExit::LimitReached) => {
            metrics.limit_stops.fetch_add(1, Ordering::Relaxed);
        }
        Some(LoopExit::SinkRejected) => {
            metrics.sink_rejections.fetch_add(1, Ordering::Relaxed);
        }
        Some(LoopExit::Exhausted) | None => {}
    }
}

pub fn record_detection(scope: AbortScope) {
    let metrics = metrics();
    match scope {
        AbortScope::StatementOnly => metrics.detections_statement_only.fetch_add(1, Ordering::Relaxed),
        AbortScope::ConnectionWide => metrics.detections_connection_wide.fetch_add(1, Ordering::Relaxed),
    };
}

#[derive(Debug, Serialize)]
pub struct InterceptorMetricsSnapshot {
    pub statements: u64,
    pub rows_processed: u64,
    pub limit_stops: u64,
    pub sink_rejections: u64,
    pub detections_statement_only: u64,
    pub detections_connection_wide: u64,
}

impl InterceptorMetricsSnapshot {
    pub fn detections(&self) -> u64 {
        self.detections_statement_only + self.detections_connection_wide
    }
}

pub fn snapshot() -> InterceptorMetricsSnapshot {
    let metrics = metrics();
    InterceptorMetricsSnapshot {
        statements: metrics.statements.load(Ordering::Relaxed),
        rows_processed: metrics.rows_processed.load(Ordering::Relaxed),
        limit_stops: metrics.limit_stops.load(Ordering::Relaxed),
        sink_rejections: metrics.sink_rejections.load(Ordering::Relaxed),
        detections_statement_only: metrics.detections_statement_only.load(Ordering::Relaxed),
        detections_connection_wide: metrics.detections_connection_wide.load(Ordering::Relaxed),
    }
}
