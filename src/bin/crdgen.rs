//! # CRD Generator
//!
//! Prints the `ManagedCertificate` CustomResourceDefinition as YAML.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/managedcertificate.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::CustomResourceExt;
use managed_certificate_controller::crd::ManagedCertificate;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&ManagedCertificate::crd())?);
    Ok(())
}
