//! Self-signed certificate provisioning.

pub mod provisioner;

pub use provisioner::{CertificatePair, CertificateProvisioner, ProvisionError, ProvisionOutcome};
