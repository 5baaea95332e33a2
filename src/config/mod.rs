//! # Configuration
//!
//! Controller configuration.
//!
//! - `controller`: Settings loaded from environment variables, overridable by CLI flags
//! - `cli`: Command-line flags of the controller binary
//! - `gce`: GCE provider config file and project/token resolution

mod cli;
mod controller;
mod gce;

pub use cli::ControllerArgs;
pub use controller::{ControllerConfig, LogFormat};
pub use gce::{ConfigError, GceConfig, GceConfigFile, TokenSource};
