use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use rand::RngCore;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyUsagePurpose, SanType, SerialNumber,
};
use time::OffsetDateTime;

use super::key::{KeyAlgorithm, KeyMaterial};
use super::CertError;
use crate::config::{
    CERT_FILE_NAME, CERT_HOSTS, CERT_ORGANIZATION, CERT_VALIDITY_DAYS, KEY_FILE_NAME,
    RSA_KEY_BITS,
};

/// PEM block type of certificates
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Serial numbers are drawn from [0, 2^128)
const SERIAL_BYTES: usize = 16;

/// Certificate and key, ready for the TLS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateMaterial {
    /// PEM bytes held only in memory
    InMemory { cert_pem: Vec<u8>, key_pem: Vec<u8> },
    /// PEM files on disk
    OnDisk { cert_path: PathBuf, key_path: PathBuf },
}

/// Obtain certificate material for the TLS listener.
///
/// With `persist`, existing `cert.pem`/`key.pem` under `dir` are reused as-is;
/// otherwise a new key and certificate are generated and written there. Without
/// `persist`, fresh material is generated and only kept in memory.
pub fn provision(dir: &Path, persist: bool) -> Result<CertificateMaterial, CertError> {
    let cert_path = dir.join(CERT_FILE_NAME);
    let key_path = dir.join(KEY_FILE_NAME);

    if persist {
        match (cert_path.exists(), key_path.exists()) {
            (true, true) => {
                tracing::info!(
                    cert = %cert_path.display(),
                    key = %key_path.display(),
                    "Reusing existing certificate"
                );
                return Ok(CertificateMaterial::OnDisk { cert_path, key_path });
            }
            (true, false) => return Err(incomplete(&cert_path, &key_path)),
            (false, true) => return Err(incomplete(&key_path, &cert_path)),
            (false, false) => {}
        }
    }

    let key = KeyMaterial::generate(KeyAlgorithm::Rsa { bits: RSA_KEY_BITS })?;
    let cert_pem = generate_self_signed(&key, CERT_HOSTS)?;
    let key_pem = key.private_key_pem()?;
    tracing::debug!(algorithm = key.algorithm_name(), "Generated self-signed certificate");

    if !persist {
        return Ok(CertificateMaterial::InMemory {
            cert_pem: cert_pem.into_bytes(),
            key_pem: key_pem.into_bytes(),
        });
    }

    fs::create_dir_all(dir).map_err(|source| CertError::Write {
        path: dir.display().to_string(),
        source,
    })?;
    write_pair(&cert_path, cert_pem.as_bytes(), &key_path, key_pem.as_bytes())?;

    Ok(CertificateMaterial::OnDisk { cert_path, key_path })
}

/// Build and self-sign a server certificate for `hosts` with `key`.
///
/// Returns the PEM encoded certificate.
pub fn generate_self_signed(key: &KeyMaterial, hosts: &[&str]) -> Result<String, CertError> {
    let mut serial = [0u8; SERIAL_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut serial);

    let not_before = OffsetDateTime::now_utc();
    let not_after = not_before + time::Duration::days(CERT_VALIDITY_DAYS);

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::OrganizationName, CERT_ORGANIZATION);

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name;
    params.serial_number = Some(SerialNumber::from_slice(&serial));
    params.not_before = not_before;
    params.not_after = not_after;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.is_ca = IsCa::ExplicitNoCa;
    params.subject_alt_names = hosts
        .iter()
        .map(|host| match host.parse::<IpAddr>() {
            Ok(ip) => Ok(SanType::IpAddress(ip)),
            Err(_) => Ok(SanType::DnsName((*host).try_into()?)),
        })
        .collect::<Result<_, rcgen::Error>>()?;

    let signing_key = key.signing_key()?;
    let cert = params.self_signed(&signing_key)?;
    Ok(cert.pem())
}

fn incomplete(present: &Path, missing: &Path) -> CertError {
    CertError::Incomplete {
        present: present.display().to_string(),
        missing: missing.display().to_string(),
    }
}

/// Write the certificate, then the key. A certificate without its key is
/// removed again so the next run does not see partial material.
fn write_pair(
    cert_path: &Path,
    cert_pem: &[u8],
    key_path: &Path,
    key_pem: &[u8],
) -> Result<(), CertError> {
    write_new(cert_path, cert_pem, false)?;
    if let Err(e) = write_new(key_path, key_pem, true) {
        if let Err(remove_err) = fs::remove_file(cert_path) {
            tracing::warn!(
                path = %cert_path.display(),
                "Failed to remove certificate after key write failed: {}",
                remove_err
            );
        }
        return Err(e);
    }
    Ok(())
}

/// Write `contents` to a file that must not exist yet.
fn write_new(path: &Path, contents: &[u8], secret: bool) -> Result<(), CertError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if secret {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = secret;

    let to_error = |source| CertError::Write {
        path: path.display().to_string(),
        source,
    };
    let mut file = options.open(path).map_err(to_error)?;
    file.write_all(contents).map_err(to_error)?;

    tracing::info!(path = %path.display(), "written {}", path.display());
    Ok(())
}
