//! # Google Cloud Platform
//!
//! - `auth`: Access tokens for the Compute API
//! - `ssl`: Compute Engine `sslCertificates` REST client

pub mod auth;
pub mod ssl;

pub use auth::AccessTokenProvider;
pub use ssl::SslCertificatesREST;
