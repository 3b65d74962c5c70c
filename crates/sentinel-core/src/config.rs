// SPDX-License-Identifier: Apache-2.0

//! Sentinel Configuration
//!
//! Four settings fixed at process start: the relation and column to watch,
//! the marker text, and how far an abort unwinds. The host loads them once,
//! freezes them in an `Arc`, and never changes them afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AbortScope, ConfigError, ConfigResult};
use crate::types::RelationId;

pub const KEY_RELATION_ID: &str = "sentinel.relation_id";
pub const KEY_COLUMN_NO: &str = "sentinel.column_no";
pub const KEY_SENTINEL_VALUE: &str = "sentinel.sentinel_value";
pub const KEY_ABORT_STATEMENT_ONLY: &str = "sentinel.abort_statement_only";

pub const ENV_RELATION_ID: &str = "SENTINEL_RELATION_ID";
pub const ENV_COLUMN_NO: &str = "SENTINEL_COLUMN_NO";
pub const ENV_SENTINEL_VALUE: &str = "SENTINEL_VALUE";
pub const ENV_ABORT_STATEMENT_ONLY: &str = "SENTINEL_ABORT_STATEMENT_ONLY";

pub const DEFAULT_SENTINEL_VALUE: &str = "SENTINEL";

/// Process-lifetime sentinel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Relation holding the sentinel row (0 = disabled)
    #[serde(default)]
    pub relation_id: RelationId,
    /// 1-based column position of the sentinel value (0 = disabled)
    #[serde(default)]
    pub column_no: u32,
    /// Marker that triggers the abort
    #[serde(default = "default_sentinel_value")]
    pub sentinel_value: String,
    /// Unwind scope of the abort
    #[serde(default)]
    pub abort_scope: AbortScope,
}

fn default_sentinel_value() -> String {
    DEFAULT_SENTINEL_VALUE.to_string()
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            relation_id: RelationId::INVALID,
            column_no: 0,
            sentinel_value: default_sentinel_value(),
            abort_scope: AbortScope::default(),
        }
    }
}

impl SentinelConfig {
    pub fn new(relation_id: RelationId, column_no: u32, sentinel_value: impl Into<String>) -> Self {
        Self {
            relation_id,
            column_no,
            sentinel_value: sentinel_value.into(),
            abort_scope: AbortScope::default(),
        }
    }

    pub fn with_abort_scope(mut self, scope: AbortScope) -> Self {
        self.abort_scope = scope;
        self
    }

    /// The trip-wire is armed only when both a relation and a column are set
    pub fn is_enabled(&self) -> bool {
        self.relation_id.is_valid() && self.column_no > 0
    }

    pub fn marker(&self) -> &str {
        &self.sentinel_value
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.sentinel_value.is_empty() {
            return Err(ConfigError::invalid(
                KEY_SENTINEL_VALUE,
                "sentinel value must not be empty",
            ));
        }
        Ok(())
    }

    /// Builds a configuration from `sentinel.*` settings.
    ///
    /// Unknown keys are ignored, missing keys keep their defaults.
    pub fn from_settings(settings: &HashMap<String, String>) -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply(|key| settings.get(key).cloned())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from a JSON file.
    ///
    /// A missing file yields the (disabled) defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No sentinel config file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(format!("{}: {}", path.display(), e)))?;

        let config: SentinelConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::parse(e.to_string()))?;

        config.validate()?;

        info!("Loaded sentinel configuration from {:?}", path);
        Ok(config)
    }

    /// Overrides settings from `SENTINEL_*` environment variables
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply(|key| env_var_for(key).and_then(|var| std::env::var(var).ok()))?;
        self.validate()
    }

    fn apply(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(raw) = lookup(KEY_RELATION_ID) {
            self.relation_id = RelationId(parse_u32(KEY_RELATION_ID, &raw)?);
        }
        if let Some(raw) = lookup(KEY_COLUMN_NO) {
            self.column_no = parse_u32(KEY_COLUMN_NO, &raw)?;
        }
        if let Some(raw) = lookup(KEY_SENTINEL_VALUE) {
            self.sentinel_value = raw;
        }
        if let Some(raw) = lookup(KEY_ABORT_STATEMENT_ONLY) {
            self.abort_scope = if parse_bool(KEY_ABORT_STATEMENT_ONLY, &raw)? {
                AbortScope::StatementOnly
            } else {
                AbortScope::ConnectionWide
            };
        }
        Ok(())
    }
}

fn env_var_for(key: &str) -> Option<&'static str> {
    match key {
        KEY_RELATION_ID => Some(ENV_RELATION_ID),
        KEY_COLUMN_NO => Some(ENV_COLUMN_NO),
        KEY_SENTINEL_VALUE => Some(ENV_SENTINEL_VALUE),
        KEY_ABORT_STATEMENT_ONLY => Some(ENV_ABORT_STATEMENT_ONLY),
        _ => None,
    }
}

fn parse_u32(key: &str, raw: &str) -> ConfigResult<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::invalid(key, format!("expected a non-negative integer, got '{}'", raw)))
}

fn parse_bool(key: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" | "t" => Ok(true),
        "off" | "false" | "no" | "0" | "f" => Ok(false),
        _ => Err(ConfigError::invalid(key, format!("expected a boolean, got '{}'", raw))),
    }
}
