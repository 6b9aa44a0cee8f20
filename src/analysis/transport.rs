// SPDX-License-Identifier: GPL-3.0-only

//! HTTP transport to the inference endpoint

use async_trait::async_trait;
use std::time::Duration;

/// Network-level failure, before any HTTP status was received
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Raw HTTP answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a JSON body and returns status plus body text
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &reqwest::Url,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError>;
}

/// `reqwest` backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("insight-camera/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &reqwest::Url,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.without_url().to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
