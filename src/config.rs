//! Configuration building and constants.
//!
//! Turns parsed command line arguments into a single immutable `ServeConfig`
//! and defines constants for defaults, certificate provisioning and shutdown.
//! Custom header flags are validated here so malformed ones are rejected at
//! startup, before any listener is bound.

use std::path::{Path, PathBuf};
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};

use crate::cli::Args;

// =============================================================================
// Server Defaults
// =============================================================================

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default directory to serve
pub const DEFAULT_ROOT: &str = "./";

/// Grace period for in-flight requests once a shutdown signal arrives
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

// =============================================================================
// Certificate Provisioning
// =============================================================================

/// Directory name (under the home directory) for persisted certificates
pub const CERT_DIR_NAME: &str = ".serve";

/// File name of the persisted certificate
pub const CERT_FILE_NAME: &str = "cert.pem";

/// File name of the persisted private key
pub const KEY_FILE_NAME: &str = "key.pem";

/// RSA modulus size in bits
pub const RSA_KEY_BITS: usize = 2048;

/// Certificate validity window in days
pub const CERT_VALIDITY_DAYS: i64 = 365;

/// Subject organization of generated certificates
pub const CERT_ORGANIZATION: &str = "Acme Co";

/// Hosts placed in the subject alternative names
pub const CERT_HOSTS: &[&str] = &["localhost"];

// =============================================================================
// Logging
// =============================================================================

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "serve=info,tower_http=info";

/// Tracing target of the per-request access lines
pub const ACCESS_LOG_TARGET: &str = "serve::access";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Structured JSON, one object per line
    Json,
}

/// Immutable server configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Port to listen on (all interfaces)
    pub port: u16,
    /// Directory whose content is served
    pub root: PathBuf,
    /// Gzip-compress responses for clients that accept it
    pub gzip: bool,
    /// Log method and path of every request
    pub logging: bool,
    /// Serve over TLS (HTTP/2 capable) with a self-signed certificate
    pub http2: bool,
    /// Headers set on every response
    pub headers: CustomHeaders,
    /// Persist the generated certificate instead of keeping it in memory
    pub cert_save: bool,
    /// Where persisted certificates live
    pub cert_dir: PathBuf,
}

impl TryFrom<Args> for ServeConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let headers = CustomHeaders::parse(&args.header)?;
        let cert_dir = match args.cert_dir {
            Some(dir) => dir,
            None => default_cert_dir()?,
        };

        Ok(Self {
            port: args.port,
            root: args.dir,
            gzip: args.gzip,
            logging: args.logging,
            http2: args.http2,
            headers,
            cert_save: args.cert_save,
            cert_dir,
        })
    }
}

impl ServeConfig {
    /// A plain HTTP configuration serving `root` with every option off.
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self {
            port: DEFAULT_PORT,
            root: root.as_ref().to_path_buf(),
            gzip: false,
            logging: false,
            http2: false,
            headers: CustomHeaders::default(),
            cert_save: false,
            cert_dir: PathBuf::from(CERT_DIR_NAME),
        }
    }
}

/// `<home>/.serve`
pub fn default_cert_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(CERT_DIR_NAME))
}

/// Validated custom response headers.
///
/// A name given more than once keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomHeaders(Vec<(HeaderName, HeaderValue)>);

impl CustomHeaders {
    /// Parse repeated `Name: Value` flags.
    pub fn parse<S: AsRef<str>>(flags: &[S]) -> Result<Self, ConfigError> {
        let mut headers = Self::default();
        for flag in flags {
            let (name, value) = parse_header(flag.as_ref())?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, HeaderValue)> {
        self.0.iter()
    }
}

/// Split a header flag at its first `:` and trim both halves.
fn parse_header(flag: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let (name, value) = flag
        .split_once(':')
        .ok_or_else(|| ConfigError::MissingSeparator(flag.to_string()))?;
    let (name, value) = (name.trim(), value.trim());

    let name = HeaderName::try_from(name)
        .map_err(|_| ConfigError::InvalidHeaderName(flag.to_string()))?;
    let value = HeaderValue::try_from(value)
        .map_err(|_| ConfigError::InvalidHeaderValue(flag.to_string()))?;

    Ok((name, value))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid header: {0} (expected \"Name: Value\")")]
    MissingSeparator(String),
    #[error("Invalid header name in: {0}")]
    InvalidHeaderName(String),
    #[error("Invalid header value in: {0}")]
    InvalidHeaderValue(String),
    #[error("Could not determine home directory, pass --cert-dir")]
    NoHomeDir,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_parse_header_trims_both_sides() {
        let headers = CustomHeaders::parse(&["  X-Frame-Options :  DENY "]).unwrap();
        let (name, value) = headers.iter().next().unwrap();
        assert_eq!(name, "x-frame-options");
        assert_eq!(value, "DENY");
    }

    #[test]
    fn test_parse_header_splits_at_first_colon() {
        let headers =
            CustomHeaders::parse(&["Access-Control-Allow-Origin: http://localhost:3000"]).unwrap();
        let (_, value) = headers.iter().next().unwrap();
        assert_eq!(value, "http://localhost:3000");
    }

    #[test]
    fn test_parse_header_without_separator_fails() {
        let err = CustomHeaders::parse(&["X-Broken"]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSeparator(ref s) if s == "X-Broken"));
        assert!(err.to_string().contains("X-Broken"));
    }

    #[test]
    fn test_parse_header_empty_name_fails() {
        let err = CustomHeaders::parse(&[": value"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeaderName(_)));
    }

    #[test]
    fn test_parse_header_bad_value_fails() {
        let err = CustomHeaders::parse(&["X-Bad: line\nbreak"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeaderValue(_)));
    }

    #[test]
    fn test_duplicate_header_keeps_last_value() {
        let headers = CustomHeaders::parse(&["X-Env: one", "x-env: two", "X-Other: 3"]).unwrap();
        assert_eq!(headers.len(), 2);
        let (name, value) = headers.iter().next().unwrap();
        assert_eq!(name, "x-env");
        assert_eq!(value, "two");
    }

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("serve").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_config_rejects_malformed_header() {
        let result = ServeConfig::try_from(args(&["-H", "no separator here", "--cd", "/tmp/certs"]));
        assert!(matches!(result, Err(ConfigError::MissingSeparator(_))));
    }

    #[test]
    fn test_config_from_flags() {
        let config = ServeConfig::try_from(args(&[
            "-p", "9000", "-g", "-l", "-2", "--sc", "--cd", "/tmp/certs", "-H", "X-A: 1", "public",
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.root, PathBuf::from("public"));
        assert_eq!(config.cert_dir, PathBuf::from("/tmp/certs"));
        assert_eq!(config.headers.len(), 1);
        assert!(config.gzip && config.logging && config.http2 && config.cert_save);
    }

    #[test]
    fn test_default_cert_dir_under_home() {
        let dir = default_cert_dir().unwrap();
        assert!(dir.ends_with(CERT_DIR_NAME));
        assert!(dir.is_absolute());
    }

    #[test]
    fn test_config_defaults() {
        let config = ServeConfig::try_from(args(&["--cd", "/tmp/certs"])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.root, PathBuf::from(DEFAULT_ROOT));
        assert!(!config.gzip && !config.logging && !config.http2 && !config.cert_save);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_for_root_disables_everything() {
        let config = ServeConfig::for_root("site");
        assert_eq!(config.root, PathBuf::from("site"));
        assert!(!config.gzip && !config.logging && !config.http2);
        assert!(config.headers.is_empty());
    }
}
