// SPDX-License-Identifier: Apache-2.0

//! Structured logging for the interceptor.
//!
//! Detections are written as JSON lines to a daily rolling file so the
//! operator can find the statement that tripped the wire after the client
//! has only seen a generic error.

pub mod sensitive;

pub use sensitive::Sensitive;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_PREFIX: &str = "sentinel-guard.log";
pub const LOG_DIR_ENV: &str = "SENTINEL_LOG_DIR";

const DEFAULT_FILTER: &str = "sentinel_guard=info,sentinel_core=info";
const DEFAULT_RETENTION_DAYS: u64 = 14;

/// Where and how long interceptor logs are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directory: PathBuf,
    pub retention: Duration,
    /// Used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl LogSettings {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            retention: Duration::from_secs(DEFAULT_RETENTION_DAYS * 24 * 60 * 60),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// `$SENTINEL_LOG_DIR`, or `~/.sentinel-guard/logs`
    pub fn from_env() -> Self {
        let directory = match std::env::var_os(LOG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(std::env::var_os("HOME").unwrap_or_default())
                .join(".sentinel-guard")
                .join("logs"),
        };
        Self::new(directory)
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Prepares the log directory and installs the JSON file subscriber.
///
/// Returns `false` when another subscriber was already installed; the
/// directory is still prepared in that case.
pub fn init_tracing(settings: &LogSettings) -> io::Result<bool> {
    fs::create_dir_all(&settings.directory)?;
    let pruned = prune_stale_logs(&settings.directory, settings.retention)?;

    let file_appender = tracing_appender::rolling::daily(&settings.directory, LOG_FILE_PREFIX);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.default_filter));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .json()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init()
        .is_ok();

    if installed {
        install_panic_hook();
        tracing::info!(
            directory = %settings.directory.display(),
            pruned,
            "Interceptor logging initialized"
        );
    }
    Ok(installed)
}

fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".to_string());
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();

        tracing::error!(target: "panic", %location, %message, "Interceptor panicked");
        previous_hook(panic_info);
    }));
}

/// Removes interceptor log files older than `retention`, returning how
/// many were deleted. Files without the log prefix are left alone.
pub fn prune_stale_logs(log_dir: &Path, retention: Duration) -> io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if matches!(age, Some(age) if age > retention) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn age_file(path: &Path, age: Duration) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_prune_removes_only_stale_interceptor_logs() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join(format!("{}.2026-01-01", LOG_FILE_PREFIX));
        let fresh = dir.path().join(format!("{}.2026-10-16", LOG_FILE_PREFIX));
        let foreign = dir.path().join("postgres.log");
        for path in [&stale, &fresh, &foreign] {
            fs::write(path, "{}").unwrap();
        }
        age_file(&stale, DAY * 30);
        age_file(&foreign, DAY * 30);

        let removed = prune_stale_logs(dir.path(), DAY * 14).unwrap();

        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn test_settings_default_retention() {
        let settings = LogSettings::new("/tmp/sentinel");
        assert_eq!(settings.retention, DAY * 14);
        assert_eq!(settings.default_filter, DEFAULT_FILTER);
    }
}
