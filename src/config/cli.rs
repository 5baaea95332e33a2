//! # Command-Line Flags
//!
//! Flags accepted by the controller binary. Every flag is optional and falls
//! back to [`crate::config::ControllerConfig::from_env`].

use clap::Parser;

/// Managed Certificate Controller
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "managed-certificate-controller")]
#[command(
    about = "Provisions Google-managed SSL certificates for ManagedCertificate resources",
    long_about = None
)]
pub struct ControllerArgs {
    /// Path to the GCE provider config file (gce.conf)
    #[arg(long)]
    pub gce_config_file_path: Option<String>,

    /// Number of worker loops processing the queue
    #[arg(long)]
    pub workers: Option<usize>,

    /// Seconds between full resyncs of all ManagedCertificate resources
    #[arg(long)]
    pub resync_interval: Option<u64>,

    /// Port of the metrics and health probe server
    #[arg(long)]
    pub metrics_port: Option<u16>,
}
