// SPDX-License-Identifier: Apache-2.0

//! Abort Dispatcher
//!
//! Converts a sentinel detection into the error that unwinds the statement
//! (or the whole session) through the host's error path.

use tracing::error;

use sentinel_core::{AbortScope, ErrorRaiser, ExecutorError, RelationId, DETECTION_MESSAGE};

use crate::metrics;

/// Default [`ErrorRaiser`]: logs the detection, counts it, and hands back
/// the scoped abort error.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortDispatcher;

impl AbortDispatcher {
    pub fn new() -> Self {
        Self
    }
}

impl ErrorRaiser for AbortDispatcher {
    fn raise(&self, scope: AbortScope, relation_id: RelationId, column: u32) -> ExecutorError {
        error!(
            severity = %scope.severity(),
            relation_id = relation_id.0,
            column,
            "{}",
            DETECTION_MESSAGE
        );
        metrics::record_detection(scope);
        ExecutorError::sentinel_detected(scope, relation_id, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_keeps_scope() {
        let dispatcher = AbortDispatcher::new();

        let err = dispatcher.raise(AbortScope::StatementOnly, RelationId(10), 1);
        assert_eq!(err.abort_scope(), Some(AbortScope::StatementOnly));
        assert!(!err.terminates_connection());

        let err = dispatcher.raise(AbortScope::ConnectionWide, RelationId(10), 1);
        assert!(err.terminates_connection());
    }

    #[test]
    fn test_raise_is_counted() {
        let before = metrics::snapshot();
        AbortDispatcher::new().raise(AbortScope::ConnectionWide, RelationId(11), 3);
        let after = metrics::snapshot();
        assert!(after.detections_connection_wide >= before.detections_connection_wide + 1);
    }
}
