//! # Runtime
//!
//! Process-level wiring of the controller.
//!
//! - `initialization`: rustls, tracing, metrics, probe server, clients
//! - `error_policy`: watch stream error handling
//! - `watch_loop`: watch, resync and graceful shutdown

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, InitializationResult};
pub use watch_loop::run_watch_loop;
