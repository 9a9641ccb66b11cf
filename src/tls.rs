//! TLS assembly from externally supplied PEM material.
//!
//! This module only loads and wires certificate files into rustls
//! configurations; generating the material is someone else's job. The
//! server side requires and verifies client certificates against the
//! configured root, so production traffic is mutual TLS end to end.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};

use crate::config::TlsConfig;

/// Builds the mutual-TLS server configuration: our certificate chain plus
/// mandatory client-certificate verification against the CA root.
pub fn server_config(tls: &TlsConfig) -> Result<ServerConfig> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(&tls.ca_cert)? {
        roots
            .add(cert)
            .with_context(|| format!("invalid CA certificate in {}", tls.ca_cert.display()))?;
    }

    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .context("failed to build client certificate verifier")?;

    let config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(
            load_certs(&tls.server_cert)?,
            load_key(&tls.server_key)?,
        )
        .context("invalid server certificate or key")?;

    Ok(config)
}

/// Builds the outbound client configuration: the CA as the trust root and
/// our client certificate for peers that demand mutual TLS. Handed to
/// collaborators that make outbound calls on the service's behalf.
pub fn client_config(tls: &TlsConfig) -> Result<rustls::ClientConfig> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(&tls.ca_cert)? {
        roots
            .add(cert)
            .with_context(|| format!("invalid CA certificate in {}", tls.ca_cert.display()))?;
    }

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(
            load_certs(&tls.client_cert)?,
            load_key(&tls.client_key)?,
        )
        .context("invalid client certificate or key")?;

    Ok(config)
}

/// Reads every certificate from a PEM file.
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("error reading certificate {}", path.display()))?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("error parsing certificate {}", path.display()))?;

    if certs.is_empty() {
        anyhow::bail!("no certificates found in {}", path.display());
    }
    Ok(certs)
}

/// Reads the first private key from a PEM file.
fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .with_context(|| format!("error reading private key {}", path.display()))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .with_context(|| format!("error parsing private key {}", path.display()))?
        .with_context(|| format!("no private key found in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_certificate_file_is_an_error() {
        let err = load_certs(Path::new("/nonexistent/ca.pem")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/ca.pem"));
    }

    #[test]
    fn empty_pem_has_no_certificates() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_certs(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("no certificates"));
    }
}
