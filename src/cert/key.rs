//! Private key material for self-signed certificates.
//!
//! Keys are a tagged variant so the two places that care about the algorithm
//! (public key extraction and PEM encoding) match on it exhaustively.

use rcgen::{KeyPair, PKCS_ECDSA_P256_SHA256, PKCS_RSA_SHA256};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use super::CertError;

/// PEM block type of PKCS#1 RSA keys
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";

/// PEM block type of PKCS#8 keys
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Key algorithm to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa { bits: usize },
    EcdsaP256,
}

/// A generated private key.
pub enum KeyMaterial {
    Rsa(RsaPrivateKey),
    Ecdsa(KeyPair),
}

impl KeyMaterial {
    /// Generate a fresh key.
    ///
    /// RSA generation is CPU bound and takes a noticeable amount of time;
    /// call it from a blocking context.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self, CertError> {
        match algorithm {
            KeyAlgorithm::Rsa { bits } => {
                let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)?;
                Ok(Self::Rsa(key))
            }
            KeyAlgorithm::EcdsaP256 => Ok(Self::Ecdsa(KeyPair::generate_for(
                &PKCS_ECDSA_P256_SHA256,
            )?)),
        }
    }

    /// DER encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CertError> {
        match self {
            Self::Rsa(key) => {
                let public = RsaPublicKey::from(key);
                Ok(public.to_public_key_der()?.as_bytes().to_vec())
            }
            Self::Ecdsa(pair) => Ok(pair.public_key_der()),
        }
    }

    /// PEM encoding of the private key, in the block type matching the algorithm.
    pub fn private_key_pem(&self) -> Result<String, CertError> {
        match self {
            Self::Rsa(key) => Ok(key.to_pkcs1_pem(LineEnding::LF)?.to_string()),
            Self::Ecdsa(pair) => Ok(pair.serialize_pem()),
        }
    }

    /// A key pair usable by rcgen for signing.
    pub fn signing_key(&self) -> Result<KeyPair, CertError> {
        match self {
            Self::Rsa(key) => {
                let pkcs8 = key.to_pkcs8_pem(LineEnding::LF)?;
                Ok(KeyPair::from_pem_and_sign_algo(&pkcs8, &PKCS_RSA_SHA256)?)
            }
            Self::Ecdsa(pair) => Ok(KeyPair::from_pem(&pair.serialize_pem())?),
        }
    }

    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Self::Rsa(_) => "rsa",
            Self::Ecdsa(_) => "ecdsa-p256",
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KeyMaterial").field(&self.algorithm_name()).finish()
    }
}
