// SPDX-License-Identifier: Apache-2.0

//! Session model
//!
//! A connection runs its statements through the hook chain and enforces the
//! abort scope: a statement-only abort fails just that statement, a
//! connection-wide abort terminates the session for good.
//!
//! Like a backend process, a connection runs one statement at a time;
//! executing takes `&mut self`, so no statement can still be running when
//! another one terminates the session.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{instrument, warn};
use uuid::Uuid;

use sentinel_core::{ExecutorError, ScanDirection};

use crate::interceptor::{HookChain, QueryDesc, StatementSummary};

/// Unique identifier for a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors a client sees when running statements
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection {session_id:?} was terminated")]
    Terminated { session_id: SessionId },

    #[error("Statement timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error(transparent)]
    Statement(#[from] ExecutorError),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Open,
    Terminated { at: DateTime<Utc> },
}

/// One client connection
pub struct Connection {
    id: SessionId,
    chain: Arc<HookChain>,
    state: ConnectionState,
    statement_timeout: Option<Duration>,
}

impl Connection {
    pub fn new(chain: Arc<HookChain>) -> Self {
        Self {
            id: SessionId::new(),
            chain,
            state: ConnectionState::Open,
            statement_timeout: None,
        }
    }

    /// Cancels statements that run longer than `limit`.
    ///
    /// A cancelled statement drops its plan and destination without
    /// shutting them down; the connection stays open.
    pub fn with_statement_timeout(mut self, limit: Duration) -> Self {
        self.statement_timeout = Some(limit);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state.clone()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ConnectionState::Open)
    }

    /// Runs a statement forward to completion
    pub async fn execute(&mut self, desc: QueryDesc) -> SessionResult<StatementSummary> {
        self.execute_with(desc, ScanDirection::Forward, 0).await
    }

    /// Runs a statement in `direction`, processing at most `count` tuples
    #[instrument(skip(self, desc), fields(session = %self.id.0, statement = %desc.statement_id.0))]
    pub async fn execute_with(
        &mut self,
        mut desc: QueryDesc,
        direction: ScanDirection,
        count: u64,
    ) -> SessionResult<StatementSummary> {
        if !self.is_open() {
            return Err(SessionError::Terminated { session_id: self.id });
        }

        let run = self.chain.run(&mut desc, direction, count);
        let result = match self.statement_timeout {
            Some(limit) => match timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(SessionError::Timeout {
                        timeout_ms: millis(limit),
                    })
                }
            },
            None => run.await,
        };

        match result {
            Ok(summary) => Ok(summary),
            Err(err) => {
                if err.terminates_connection() {
                    warn!("Terminating connection after sentinel abort");
                    self.state = ConnectionState::Terminated { at: Utc::now() };
                }
                Err(err.into())
            }
        }
    }
}

fn millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_millis_saturate() {
        assert_eq!(millis(Duration::from_millis(20)), 20);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
