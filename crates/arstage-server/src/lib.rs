//! # arstage-server
//!
//! Local static file server for the ARStage web demo.
//!
//! On startup a self-signed certificate is provisioned with `openssl`. When
//! that succeeds the `public` tree is served over HTTPS; when it fails the
//! same tree is served over plain HTTP on a fallback port.

pub mod app;
pub mod banner;
pub mod middleware;
pub mod router;
pub mod tls;

pub use app::{ListenMode, StaticServer, run_server};
pub use router::build_router;
pub use tls::{CertificatePair, CertificateProvisioner, ProvisionError, ProvisionOutcome};
