use crate::cert::CertError;
use crate::config::ConfigError;
use crate::http::ServerError;

/// Any error that stops `serve` from starting or shutting down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Couldn't create https certs: {0}")]
    Cert(#[from] CertError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
