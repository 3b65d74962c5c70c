// SPDX-License-Identifier: Apache-2.0

//! Extension lifecycle
//!
//! Loading the extension freezes the configuration and installs the
//! sentinel executor into the hook chain; unloading restores whatever was
//! registered before.

use std::sync::Arc;

use tracing::{info, warn};

use sentinel_core::{ConfigError, ConfigResult, ErrorRaiser, ParallelCoordinator, SentinelConfig};

use crate::interceptor::{AbortDispatcher, HookChain, HookHandle, ParallelModeState, SentinelExecutor};
use crate::observability::{self, LogSettings, Sensitive};

/// A loaded sentinel extension
pub struct SentinelExtension {
    chain: Arc<HookChain>,
    config: Arc<SentinelConfig>,
    handle: HookHandle,
}

impl SentinelExtension {
    /// Validates `config`, freezes it, and installs the sentinel executor
    /// with the default abort dispatcher
    pub fn load(chain: Arc<HookChain>, config: SentinelConfig) -> ConfigResult<Self> {
        Self::load_with(
            chain,
            config,
            Arc::new(AbortDispatcher::new()),
            Arc::new(ParallelModeState::new()),
        )
    }

    /// Sets up the JSON log file under `logging.directory` before loading,
    /// so detections are recorded from the first statement on
    pub fn load_with_logging(
        chain: Arc<HookChain>,
        config: SentinelConfig,
        logging: &LogSettings,
    ) -> ConfigResult<Self> {
        observability::init_tracing(logging).map_err(|e| {
            ConfigError::io(format!("{}: {}", logging.directory.display(), e))
        })?;
        Self::load(chain, config)
    }

    /// Like [`SentinelExtension::load`], with host-supplied abort and
    /// parallel-mode capabilities
    pub fn load_with(
        chain: Arc<HookChain>,
        config: SentinelConfig,
        raiser: Arc<dyn ErrorRaiser>,
        parallel: Arc<dyn ParallelCoordinator>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let config = Arc::new(config);

        if !config.is_enabled() {
            warn!("Sentinel relation or column not set; rows will not be inspected");
        }

        let executor = SentinelExecutor::new(Arc::clone(&config), raiser, parallel);
        let handle = chain.install(Arc::new(executor));

        info!(
            relation_id = config.relation_id.0,
            column = config.column_no,
            marker = %Sensitive::new(config.marker()),
            severity = %config.abort_scope.severity(),
            "Sentinel extension loaded"
        );

        Ok(Self {
            chain,
            config,
            handle,
        })
    }

    pub fn config(&self) -> &Arc<SentinelConfig> {
        &self.config
    }

    /// Restores the hook that was registered before this extension loaded
    pub fn unload(self) {
        self.chain.uninstall(self.handle);
        info!("Sentinel extension unloaded");
    }
}
