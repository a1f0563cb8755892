//! Collector trust setup.
//!
//! The exporter trusts exactly the CA loaded from the configured PEM file.
//! No system or bundled roots are consulted.

use std::path::Path;

use rustls::RootCertStore;
use tonic::transport::{Certificate, ClientTlsConfig};
use tracing::info;

use cartpulse_core::error::{CartPulseError, Result};

/// CA bundle read from disk and checked certificate by certificate.
pub struct CollectorCa {
    pem: Vec<u8>,
    roots: RootCertStore,
}

impl CollectorCa {
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Client TLS config whose only trust anchors are this bundle.
    pub fn tls_config(&self) -> ClientTlsConfig {
        ClientTlsConfig::new().ca_certificate(Certificate::from_pem(&self.pem))
    }
}

/// Read every certificate in `path` into an otherwise empty root store.
pub fn load_ca(path: &Path) -> Result<CollectorCa> {
    let pem = std::fs::read(path).map_err(|e| {
        CartPulseError::Config(format!("could not read CA file {}: {e}", path.display()))
    })?;

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
        let cert = cert.map_err(|e| {
            CartPulseError::Config(format!("could not read CA file {}: {e}", path.display()))
        })?;
        roots.add(cert).map_err(|e| {
            CartPulseError::Config(format!(
                "could not add CA certificate from {}: {e}",
                path.display()
            ))
        })?;
    }

    if roots.is_empty() {
        return Err(CartPulseError::Config(format!(
            "could not add CA certificate: no PEM certificate found in {}",
            path.display()
        )));
    }

    info!(path = %path.display(), roots = roots.len(), "loaded collector CA");
    Ok(CollectorCa { pem, roots })
}
