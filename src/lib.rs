//! serve - deliver the content of a directory via http/https
//!
//! A local development file server with optional gzip compression, request
//! logging, custom response headers and HTTPS with a self-signed certificate.

pub mod app;
pub mod cert;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod pipeline;

pub use config::ServeConfig;
pub use error::Error;
