//! HTTP server module with optional TLS.
//!
//! The server includes:
//! - Static file serving from the configured root
//! - HTTPS with a self-signed certificate, offering HTTP/2 via ALPN
//! - Graceful shutdown on SIGTERM/SIGINT with a bounded drain

mod server;
mod shutdown;
pub mod static_files;
pub mod tls;

pub use server::{LifecycleState, Server, ServerError};
pub use shutdown::shutdown_signal;
