//! HTTP client factory with consistent timeouts.
//!
//! Outbound clients (Mercado Pago, Gemini) are built here rather than with
//! `reqwest::Client::new()`.

use reqwest::Client;
use std::time::Duration;

use crate::infra::error::InfraError;

/// TCP handshake + TLS.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request/response time for processor calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Generative answers take longer than processor lookups.
pub const GENERATIVE_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

pub fn build_client() -> Result<Client, InfraError> {
    build_client_with_timeout(DEFAULT_REQUEST_TIMEOUT)
}

pub fn build_client_with_timeout(timeout: Duration) -> Result<Client, InfraError> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(InfraError::HttpClient)
}
