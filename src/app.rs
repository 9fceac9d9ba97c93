//! Startup and shutdown wiring.
//!
//! Composes the request pipeline, provisions certificate material when
//! serving HTTPS, binds the listener and drives the shutdown drain.

use std::net::SocketAddr;

use crate::cert::{self, CertificateMaterial};
use crate::config::{ServeConfig, SHUTDOWN_GRACE_PERIOD};
use crate::error::Error;
use crate::http::{shutdown_signal, tls, Server};
use crate::pipeline;

/// Bind the listener described by `config` and start serving.
pub async fn start(config: &ServeConfig) -> Result<Server, Error> {
    let app = pipeline::compose(config);
    tracing::debug!(steps = ?pipeline::steps(config), "Composed request pipeline");

    let tls = if config.http2 {
        let material = provision_material(config).await?;
        Some(tls::rustls_config(&material).await?)
    } else {
        None
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let server = Server::start(addr, app, tls).await?;

    let scheme = if server.is_tls() { "https" } else { "http" };
    tracing::info!(
        root = %config.root.display(),
        %scheme,
        "Serving content of {} on localhost:{} ...",
        config.root.display(),
        server.local_addr().port()
    );

    Ok(server)
}

/// Serve until SIGINT/SIGTERM, then drain and stop.
pub async fn run(config: ServeConfig) -> Result<(), Error> {
    let server = start(&config).await?;

    shutdown_signal().await;
    tracing::info!("Stopping.");

    server.shutdown(SHUTDOWN_GRACE_PERIOD).await?;
    Ok(())
}

/// Generate (or reuse) the certificate off the async runtime.
async fn provision_material(config: &ServeConfig) -> Result<CertificateMaterial, Error> {
    let dir = config.cert_dir.clone();
    let persist = config.cert_save;

    let material = tokio::task::spawn_blocking(move || cert::provision(&dir, persist)).await??;
    Ok(material)
}
