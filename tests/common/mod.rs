//! Common test utilities for integration tests
//!
//! Shared setup for the Pact and dispatcher tests, including rustls crypto
//! provider setup.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use managed_certificate_controller::runtime::initialization::install_crypto_provider;
use std::sync::Once;

static RUSTLS_INIT: Once = Once::new();

/// Initialize the rustls crypto provider once per test binary
pub fn init_rustls() {
    RUSTLS_INIT.call_once(install_crypto_provider);
}

/// Pact mock server URL without the trailing slash
pub fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
