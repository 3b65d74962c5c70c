// SPDX-License-Identifier: Apache-2.0

//! Sentinel Core
//!
//! Host-independent vocabulary shared by the interceptor and its hosts:
//! rows and column values, the capability traits the execution loop drives,
//! error types, and the frozen sentinel configuration.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::SentinelConfig;
pub use error::{
    AbortScope, ConfigError, ConfigResult, ExecutorError, ExecutorResult, Severity,
    DETECTION_MESSAGE,
};
pub use traits::{ErrorRaiser, ParallelCoordinator, PlanSource, ProjectionFilter, RowSink};
pub use types::{Datum, OperationKind, RelationId, Row, ScanDirection};
