//! # Resource Identity
//!
//! `namespace/name` keys used by the work queue.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing a queue key
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("unexpected key format: {0:?}")]
    Malformed(String),
}

/// Identity of a ManagedCertificate resource
///
/// Formats as `namespace/name`, or just `name` when the namespace is empty,
/// and parses back from the same form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a Kubernetes object, `None` when it has no name
    pub fn from_object<K: kube::Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        let name = meta.name.clone().filter(|n| !n.is_empty())?;
        Some(Self {
            namespace: meta.namespace.clone().unwrap_or_default(),
            name,
        })
    }

    /// Queue key of this resource
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let malformed = || ResourceIdError::Malformed(key.to_string());

        let (namespace, name) = match key.split_once('/') {
            Some((namespace, name)) if !name.contains('/') => (namespace, name),
            Some(_) => return Err(malformed()),
            None => ("", key),
        };

        if name.is_empty() {
            return Err(malformed());
        }

        Ok(Self::new(namespace, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let id = ResourceId::new("default", "site");
        assert_eq!(id.key(), "default/site");
        assert_eq!("default/site".parse::<ResourceId>(), Ok(id));
    }

    #[test]
    fn test_key_without_namespace() {
        let id: ResourceId = "site".parse().unwrap();
        assert_eq!(id, ResourceId::new("", "site"));
        assert_eq!(id.key(), "site");
    }

    #[test]
    fn test_malformed_keys() {
        for key in ["", "default/", "a/b/c", "/"] {
            assert_eq!(
                key.parse::<ResourceId>(),
                Err(ResourceIdError::Malformed(key.to_string())),
                "key {key:?}"
            );
        }
    }

    #[test]
    fn test_from_object() {
        use crate::crd::{ManagedCertificate, ManagedCertificateSpec};

        let mut mcrt = ManagedCertificate::new(
            "site",
            ManagedCertificateSpec {
                domains: vec!["example.com".to_string()],
            },
        );
        mcrt.metadata.namespace = Some("default".to_string());

        assert_eq!(
            ResourceId::from_object(&mcrt),
            Some(ResourceId::new("default", "site"))
        );

        mcrt.metadata.name = None;
        assert_eq!(ResourceId::from_object(&mcrt), None);
    }
}
