//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::config::ControllerArgs;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "plain" => Ok(LogFormat::Text),
            other => Err(format!("unsupported log format: {other}")),
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Command-line flags take precedence over the environment (see [`ControllerConfig::apply_args`]).
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Number of worker loops draining the work queue
    pub workers: usize,
    /// Interval between full resyncs (seconds)
    pub resync_interval_secs: u64,
    /// Initial per-key retry delay (milliseconds)
    pub backoff_base_ms: u64,
    /// Maximum per-key retry delay (seconds)
    pub backoff_max_secs: u64,
    /// Client-side timeout of every Compute Engine call (seconds)
    pub cloud_timeout_secs: u64,
    /// Watch stream restart delay after the stream ends or fails (seconds)
    pub watch_restart_delay_secs: u64,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Log format (json, text)
    pub log_format: LogFormat,
    /// Path to the GCE provider config file, metadata server is used when unset
    pub gce_config_file_path: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            workers: DEFAULT_WORKERS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            cloud_timeout_secs: DEFAULT_CLOUD_TIMEOUT_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            log_format: LogFormat::default(),
            gce_config_file_path: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            workers: env_var_or_default("WORKERS", DEFAULT_WORKERS),
            resync_interval_secs: env_var_or_default(
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            ),
            backoff_base_ms: env_var_or_default("BACKOFF_BASE_MS", DEFAULT_BACKOFF_BASE_MS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            cloud_timeout_secs: env_var_or_default(
                "CLOUD_TIMEOUT_SECS",
                DEFAULT_CLOUD_TIMEOUT_SECS,
            ),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            log_format: env_var_or_default("LOG_FORMAT", LogFormat::default()),
            gce_config_file_path: std::env::var("GCE_CONFIG_FILE_PATH")
                .ok()
                .filter(|p| !p.is_empty()),
        }
    }

    /// Override settings with the flags given on the command line
    #[must_use]
    pub fn apply_args(mut self, args: &ControllerArgs) -> Self {
        if let Some(workers) = args.workers {
            self.workers = workers;
        }
        if let Some(secs) = args.resync_interval {
            self.resync_interval_secs = secs;
        }
        if let Some(port) = args.metrics_port {
            self.metrics_port = port;
        }
        if let Some(path) = &args.gce_config_file_path {
            self.gce_config_file_path = Some(path.clone());
        }
        // A pool without workers would never drain the queue
        self.workers = self.workers.max(1);
        self
    }

    /// Get resync interval duration
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Get backoff base duration
    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Get backoff max duration
    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }

    /// Get cloud call timeout duration
    #[must_use]
    pub fn cloud_timeout(&self) -> Duration {
        Duration::from_secs(self.cloud_timeout_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
