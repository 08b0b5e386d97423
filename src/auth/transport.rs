// HTTP transport for token requests

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;

use super::types::TokenRequest;
use crate::error::{TokenError, TransportErrorKind};

/// Default request timeout for token issuance
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Content type the token endpoint expects
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends the token request as a JSON POST and returns whatever the server
/// answered.
///
/// Implementations report failures that produced no response as
/// `TokenError::Transport`.
#[async_trait]
pub trait TokenTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &TokenRequest<'_>,
    ) -> Result<TransportResponse, TokenError>;
}

/// reqwest-backed transport with a fixed timeout
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl TokenTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &TokenRequest<'_>,
    ) -> Result<TransportResponse, TokenError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(TransportResponse { status, body })
    }
}

/// Map a reqwest error onto the transport categories
fn classify(err: reqwest::Error) -> TokenError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connection
    } else {
        TransportErrorKind::Other
    };

    TokenError::transport(kind, err.to_string())
}
