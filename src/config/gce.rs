//! # GCE Configuration
//!
//! Resolves the Compute Engine project and the token source used to
//! authenticate against the Compute API.
//!
//! Inside a GKE cluster the cloud provider config file (`gce.conf`) is mounted
//! into the controller. It carries the project id plus an alternate token
//! endpoint:
//!
//! ```ini
//! [global]
//! project-id = my-project
//! token-url = https://gkeauth.googleapis.com/v1/projects/123/locations/us-central1/clusters/c:generateToken
//! token-body = "{\"projectNumber\":123,\"clusterId\":\"c\"}"
//! ```
//!
//! Without the file the project id is read from the metadata server. Tokens
//! are minted from the service account key named by
//! `GOOGLE_APPLICATION_CREDENTIALS` when it is set, and come from the
//! metadata server otherwise.

use crate::constants::{GOOGLE_APPLICATION_CREDENTIALS_ENV, METADATA_SERVER_URL};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while resolving the GCE configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read cloud provider configuration {path}: {source}")]
    File {
        path: String,
        #[source]
        source: config::ConfigError,
    },
    #[error("cloud provider configuration {path} has no project-id")]
    MissingProjectId { path: String },
    #[error("could not fetch project id from metadata server: {0}")]
    Metadata(String),
}

/// `[global]` section of the GCE provider config file
///
/// Only the keys the controller needs are read; any other key is ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GceConfigGlobal {
    #[serde(rename = "project-id", default)]
    pub project_id: String,
    #[serde(rename = "token-url", default)]
    pub token_url: String,
    #[serde(rename = "token-body", default)]
    pub token_body: String,
}

/// GCE provider config file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GceConfigFile {
    #[serde(default)]
    pub global: GceConfigGlobal,
}

impl GceConfigFile {
    /// Read the config file at `path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::File`] when the file is missing or not valid INI.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let file_error = |source| ConfigError::File {
            path: path.to_string(),
            source,
        };

        config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Ini).required(true))
            .build()
            .map_err(file_error)?
            .try_deserialize()
            .map_err(file_error)
    }
}

/// Where access tokens for the Compute API come from
#[derive(Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// GCE metadata server (Workload Identity or node service account)
    Metadata { base_url: String },
    /// Alternate token endpoint from the GCE provider config file
    /// The body is POSTed verbatim to the URL
    AltToken { token_url: String, token_body: String },
    /// Service account key file, exchanged for tokens with a signed JWT
    ServiceAccount { credentials_path: String },
    /// Fixed bearer token
    Static { token: String },
}

impl TokenSource {
    /// Token source used when no GCE provider config file is mounted
    ///
    /// A non-empty credentials path selects the service account key,
    /// anything else the metadata server at `metadata_base_url`.
    #[must_use]
    pub fn without_config_file(metadata_base_url: &str, credentials_path: Option<String>) -> Self {
        match credentials_path.filter(|path| !path.is_empty()) {
            Some(credentials_path) => TokenSource::ServiceAccount { credentials_path },
            None => TokenSource::Metadata {
                base_url: metadata_base_url.to_string(),
            },
        }
    }
}

// Tokens and token request bodies never end up in logs
impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Metadata { base_url } => f
                .debug_struct("Metadata")
                .field("base_url", base_url)
                .finish(),
            TokenSource::AltToken { token_url, .. } => f
                .debug_struct("AltToken")
                .field("token_url", token_url)
                .finish_non_exhaustive(),
            TokenSource::ServiceAccount { credentials_path } => f
                .debug_struct("ServiceAccount")
                .field("credentials_path", credentials_path)
                .finish(),
            TokenSource::Static { .. } => f.debug_struct("Static").finish_non_exhaustive(),
        }
    }
}

/// Resolved Compute Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GceConfig {
    pub project_id: String,
    pub token_source: TokenSource,
}

impl GceConfig {
    /// Build the configuration from a GCE provider config file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not name a project.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let file = GceConfigFile::load(path)?;
        if file.global.project_id.is_empty() {
            return Err(ConfigError::MissingProjectId {
                path: path.to_string(),
            });
        }

        info!(
            project.id = %file.global.project_id,
            token.url = %file.global.token_url,
            "Using GCE provider config {}", path
        );

        Ok(Self {
            project_id: file.global.project_id,
            token_source: TokenSource::AltToken {
                token_url: file.global.token_url,
                token_body: file.global.token_body,
            },
        })
    }

    /// Build the configuration from the metadata server
    ///
    /// # Errors
    ///
    /// Fails when the metadata server is unreachable or returns an error.
    pub async fn from_metadata_server(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Metadata(e.to_string()))?;

        let url = format!("{base_url}/computeMetadata/v1/project/project-id");
        let response = client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| ConfigError::Metadata(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ConfigError::Metadata(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let project_id = response
            .text()
            .await
            .map_err(|e| ConfigError::Metadata(e.to_string()))?
            .trim()
            .to_string();

        debug!(project.id = %project_id, "Resolved project id from metadata server");

        Ok(Self {
            project_id,
            token_source: TokenSource::Metadata {
                base_url: base_url.to_string(),
            },
        })
    }

    /// Resolve the configuration
    ///
    /// A config file path wins. Without one the project id comes from the
    /// metadata server, and `GOOGLE_APPLICATION_CREDENTIALS` picks between
    /// service account key tokens and metadata server tokens.
    ///
    /// # Errors
    ///
    /// See [`GceConfig::from_file`] and [`GceConfig::from_metadata_server`].
    pub async fn resolve(path: Option<&str>, timeout: Duration) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            info!("In a GKE cluster, reading cloud provider configuration");
            return Self::from_file(path);
        }

        let mut config = Self::from_metadata_server(METADATA_SERVER_URL, timeout).await?;
        config.token_source = TokenSource::without_config_file(
            METADATA_SERVER_URL,
            std::env::var(GOOGLE_APPLICATION_CREDENTIALS_ENV).ok(),
        );
        if let TokenSource::ServiceAccount { credentials_path } = &config.token_source {
            info!("In a GCP cluster, using service account key {}", credentials_path);
        } else {
            info!("Using metadata server for project id and tokens");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("gce-{}.conf", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_from_file_uses_alt_token_source() {
        let path = write_config(
            "[global]\nproject-id = my-project\ntoken-url = https://example.com/token\ntoken-body = body\nnode-tags = ignored\n",
        );

        let config = GceConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.project_id, "my-project");
        assert_eq!(
            config.token_source,
            TokenSource::AltToken {
                token_url: "https://example.com/token".to_string(),
                token_body: "body".to_string(),
            }
        );

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_from_file_requires_project_id() {
        let path = write_config("[global]\ntoken-url = https://example.com/token\n");

        let err = GceConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProjectId { .. }));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = GceConfig::from_file("/nonexistent/gce.conf").unwrap_err();
        assert!(matches!(err, ConfigError::File { .. }));
    }

    #[test]
    fn test_credentials_path_selects_service_account() {
        assert_eq!(
            TokenSource::without_config_file(
                "http://metadata.test",
                Some("/var/secrets/google/key.json".to_string()),
            ),
            TokenSource::ServiceAccount {
                credentials_path: "/var/secrets/google/key.json".to_string(),
            }
        );
    }

    #[test]
    fn test_no_credentials_path_selects_metadata_server() {
        let metadata = TokenSource::Metadata {
            base_url: "http://metadata.test".to_string(),
        };
        assert_eq!(
            TokenSource::without_config_file("http://metadata.test", None),
            metadata
        );
        assert_eq!(
            TokenSource::without_config_file("http://metadata.test", Some(String::new())),
            metadata
        );
    }

    #[test]
    fn test_debug_hides_tokens() {
        let source = TokenSource::Static {
            token: "secret-token".to_string(),
        };
        assert!(!format!("{source:?}").contains("secret-token"));

        let source = TokenSource::AltToken {
            token_url: "https://example.com/token".to_string(),
            token_body: "secret-body".to_string(),
        };
        assert!(!format!("{source:?}").contains("secret-body"));
    }
}
