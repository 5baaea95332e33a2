//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing,
//! metrics, server startup, cloud configuration and Kubernetes client setup.

use crate::config::{ControllerArgs, ControllerConfig, GceConfig, LogFormat};
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use anyhow::{anyhow, Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "managed_certificate_controller=info";

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Effective controller configuration (env overridden by flags)
    pub config: ControllerConfig,
    /// Project and token source of the Compute Engine client
    pub gce: GceConfig,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("project_id", &self.gce.project_id)
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Cloud provider configuration
/// - Kubernetes client creation
///
/// # Errors
///
/// Returns an error if any of the steps above fails.
pub async fn initialize(args: &ControllerArgs) -> Result<InitializationResult> {
    install_crypto_provider();

    let config = ControllerConfig::from_env().apply_args(args);
    init_tracing(config.log_format)?;

    info!("Starting Managed Certificate Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?config, "Loaded controller configuration");

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let gce = GceConfig::resolve(config.gce_config_file_path.as_deref(), config.cloud_timeout())
        .await
        .context("Failed to resolve GCE configuration")?;
    info!(project.id = %gce.project_id, "Resolved GCE configuration");

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    Ok(InitializationResult {
        client,
        config,
        gce,
        server_state,
    })
}

/// Configure rustls to use ring
///
/// Must run before any TLS connection is made. A provider installed earlier
/// is kept.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        // Logging is not set up yet
        eprintln!("rustls crypto provider already installed");
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`].
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize tracing: {e}"))
}
