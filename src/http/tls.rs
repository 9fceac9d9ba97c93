//! TLS configuration for the HTTPS listener.
//!
//! Builds a rustls server configuration from provisioned certificate material
//! with a TLS 1.2 floor and ALPN for HTTP/2 and HTTP/1.1.

use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::ServerConfig;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use super::server::ServerError;
use crate::cert::CertificateMaterial;

/// ALPN protocols offered, in order of preference
pub const ALPN_PROTOCOLS: &[&[u8]] = &[b"h2", b"http/1.1"];

/// Load certificate material into a config usable by the HTTPS listener.
pub async fn rustls_config(material: &CertificateMaterial) -> Result<RustlsConfig, ServerError> {
    let config = match material {
        CertificateMaterial::InMemory { cert_pem, key_pem } => server_config(cert_pem, key_pem)?,
        CertificateMaterial::OnDisk {
            cert_path,
            key_path,
        } => {
            let cert_pem = tokio::fs::read(cert_path).await.map_err(|e| {
                ServerError::TlsConfig(format!("Failed to read {}: {}", cert_path.display(), e))
            })?;
            let key_pem = tokio::fs::read(key_path).await.map_err(|e| {
                ServerError::TlsConfig(format!("Failed to read {}: {}", key_path.display(), e))
            })?;
            server_config(&cert_pem, &key_pem)?
        }
    };

    Ok(RustlsConfig::from_config(Arc::new(config)))
}

/// Build a rustls server configuration from a PEM certificate chain and key.
pub fn server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<ServerConfig, ServerError> {
    let certs = CertificateDer::pem_slice_iter(cert_pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::TlsConfig(format!("Invalid certificate PEM: {}", e)))?;
    if certs.is_empty() {
        return Err(ServerError::TlsConfig(
            "No certificate found in PEM data".to_string(),
        ));
    }

    let key = PrivateKeyDer::from_pem_slice(key_pem)
        .map_err(|e| ServerError::TlsConfig(format!("Invalid private key PEM: {}", e)))?;

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
        .map_err(|e| ServerError::TlsConfig(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::TlsConfig(format!("Certificate and key rejected: {}", e)))?;
    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

    Ok(config)
}
