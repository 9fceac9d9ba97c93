//! Self-signed certificate provisioning for local HTTPS.
//!
//! Generates an RSA key and a self-signed certificate for `localhost`, either
//! kept in memory for the lifetime of the process or persisted as
//! `cert.pem`/`key.pem` and reused on later runs.

mod key;
mod provision;

pub use key::{KeyAlgorithm, KeyMaterial, PRIVATE_KEY_LABEL, RSA_PRIVATE_KEY_LABEL};
pub use provision::{generate_self_signed, provision, CertificateMaterial, CERTIFICATE_LABEL};

/// Certificate provisioning error
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    #[error("failed to generate private key: {0}")]
    KeyGeneration(#[from] rsa::Error),

    #[error("failed to encode private key: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    #[error("failed to encode private key: {0}")]
    Pkcs8(#[from] rsa::pkcs8::Error),

    #[error("failed to encode public key: {0}")]
    PublicKey(#[from] rsa::pkcs8::spki::Error),

    #[error("failed to create certificate: {0}")]
    Certificate(#[from] rcgen::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("found {present} without {missing}, refusing to overwrite")]
    Incomplete { present: String, missing: String },
}
