// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the sentinel interceptor
//!
//! Errors raised inside host-owned plans and sinks are wrapped unchanged in
//! [`ExecutorError::Host`]; the sentinel trip-wire itself surfaces as
//! [`ExecutorError::SentinelDetected`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RelationId;

/// User-visible text of a sentinel abort. Never includes the marker.
pub const DETECTION_MESSAGE: &str = "Severe internal error detected!";

/// How much of the session a sentinel abort unwinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortScope {
    /// Fail the current statement; the connection stays usable
    StatementOnly,
    /// Terminate the whole session
    #[default]
    ConnectionWide,
}

impl AbortScope {
    pub fn severity(&self) -> Severity {
        match self {
            Self::StatementOnly => Severity::Error,
            Self::ConnectionWide => Severity::Fatal,
        }
    }
}

/// Host error level an abort is reported at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Unified error type for the execution path
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ExecutorError {
    #[error("Severe internal error detected!")]
    SentinelDetected {
        scope: AbortScope,
        relation_id: RelationId,
        column: u32,
    },

    #[error("Host execution error: {message}")]
    Host { message: String },
}

impl ExecutorError {
    pub fn sentinel_detected(scope: AbortScope, relation_id: RelationId, column: u32) -> Self {
        Self::SentinelDetected {
            scope,
            relation_id,
            column,
        }
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host {
            message: msg.into(),
        }
    }

    /// Scope of the abort, if this error is a sentinel detection
    pub fn abort_scope(&self) -> Option<AbortScope> {
        match self {
            Self::SentinelDetected { scope, .. } => Some(*scope),
            Self::Host { .. } => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.abort_scope().is_some()
    }

    /// Returns true if the session must be torn down after this error
    pub fn terminates_connection(&self) -> bool {
        self.abort_scope() == Some(AbortScope::ConnectionWide)
    }
}

/// Result type alias for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Errors raised while loading or validating the sentinel configuration
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("Invalid setting {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("Failed to read configuration: {message}")]
    Io { message: String },

    #[error("Failed to parse configuration: {message}")]
    Parse { message: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: msg.into(),
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
