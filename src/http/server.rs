//! HTTP/HTTPS listener lifecycle.
//!
//! The listener runs on its own task so the caller can wait for a shutdown
//! signal. States move `Stopped -> Starting -> Running -> Draining -> Stopped`.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::task::{JoinError, JoinHandle};

/// Server lifecycle error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load TLS configuration: {0}")]
    TlsConfig(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Connections still open after {0:?} grace period, closed forcibly")]
    GracePeriodExceeded(Duration),
}

/// Where the listener is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Draining,
}

/// A running listener.
#[derive(Debug)]
pub struct Server {
    handle: Handle,
    task: JoinHandle<std::io::Result<()>>,
    local_addr: SocketAddr,
    tls: bool,
    state: LifecycleState,
}

impl Server {
    /// Bind `addr` and start serving `app` in the background.
    ///
    /// Serves HTTPS when `tls` is given. Returns once the listener is bound;
    /// a bind failure (port in use, permission denied) is returned as
    /// `ServerError::Bind`.
    pub async fn start(
        addr: SocketAddr,
        app: Router,
        tls: Option<RustlsConfig>,
    ) -> Result<Self, ServerError> {
        log_transition(LifecycleState::Stopped, LifecycleState::Starting);

        let handle = Handle::new();
        let service = app.into_make_service();
        let is_tls = tls.is_some();
        let mut task = match tls {
            None => tokio::spawn(axum_server::bind(addr).handle(handle.clone()).serve(service)),
            Some(config) => tokio::spawn(
                axum_server::bind_rustls(addr, config)
                    .handle(handle.clone())
                    .serve(service),
            ),
        };

        let listening = tokio::select! {
            listening = handle.listening() => listening,
            joined = &mut task => return Err(startup_error(addr, joined)),
        };
        let Some(local_addr) = listening else {
            return Err(startup_error(addr, task.await));
        };

        log_transition(LifecycleState::Starting, LifecycleState::Running);
        tracing::debug!(%local_addr, tls = is_tls, "Listener bound");

        Ok(Self {
            handle,
            task,
            local_addr,
            tls: is_tls,
            state: LifecycleState::Running,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the listener serves HTTPS.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Stop accepting connections and let in-flight requests finish.
    ///
    /// Connections still open after `grace` are closed forcibly and
    /// `ServerError::GracePeriodExceeded` is returned.
    pub async fn shutdown(mut self, grace: Duration) -> Result<(), ServerError> {
        self.transition(LifecycleState::Draining);
        tracing::info!(
            connections = self.handle.connection_count(),
            grace_secs = grace.as_secs(),
            "Graceful shutdown initiated, waiting for connections to close"
        );

        self.handle.graceful_shutdown(None);

        let result = match tokio::time::timeout(grace, &mut self.task).await {
            Ok(joined) => match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ServerError::Server(e.to_string())),
                Err(e) => Err(ServerError::Server(e.to_string())),
            },
            Err(_) => {
                tracing::warn!(
                    connections = self.handle.connection_count(),
                    "Grace period exceeded, closing remaining connections"
                );
                self.handle.shutdown();
                self.task.abort();
                Err(ServerError::GracePeriodExceeded(grace))
            }
        };

        self.transition(LifecycleState::Stopped);
        result
    }

    fn transition(&mut self, to: LifecycleState) {
        log_transition(self.state, to);
        self.state = to;
    }
}

fn log_transition(from: LifecycleState, to: LifecycleState) {
    tracing::debug!(?from, ?to, "Server state changed");
}

/// Map a listener task that ended before binding to an error.
fn startup_error(
    addr: SocketAddr,
    joined: Result<std::io::Result<()>, JoinError>,
) -> ServerError {
    match joined {
        Ok(Err(source)) => ServerError::Bind { addr, source },
        Ok(Ok(())) => ServerError::Server("listener stopped before binding".to_string()),
        Err(e) => ServerError::Server(e.to_string()),
    }
}
