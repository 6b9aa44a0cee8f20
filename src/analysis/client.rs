// SPDX-License-Identifier: GPL-3.0-only

//! Inference client with retry
//!
//! Each call is independent: it reads no shared state and writes none. The
//! caller decides what to do with the outcome.

use super::payload::{AnalysisResult, GenerateContentRequest, GenerateContentResponse};
use super::transport::{HttpTransport, Transport, TransportResponse};
use crate::config::Config;
use crate::errors::{AnalysisError, AttemptError};
use crate::media::ImageBuffer;
use crate::retry::{RetryError, RetryPolicy, retry_with_backoff};
use reqwest::Url;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Longest error body kept in an attempt error
const MAX_ERROR_BODY: usize = 512;

pub struct AnalysisClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    model: String,
    api_key: Option<String>,
    policy: RetryPolicy,
}

impl AnalysisClient {
    /// Client using the HTTP transport
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        let transport = HttpTransport::new().map_err(|e| AnalysisError::Setup(e.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: config.endpoint_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.credential().map(str::to_string),
            policy: config.retry_policy(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `{base}/models/{model}:generateContent?key={credential}`
    fn request_url(&self, key: &str) -> Result<Url, AnalysisError> {
        let endpoint = format!("{}/models/{}:generateContent", self.base_url, self.model);
        Url::parse_with_params(&endpoint, &[("key", key)])
            .map_err(|e| AnalysisError::Setup(format!("Invalid endpoint URL: {}", e)))
    }

    /// Classify and describe one image
    ///
    /// Fails with `credential-missing` before any request when no credential
    /// is configured.
    pub async fn analyze(
        &self,
        image: &ImageBuffer,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(AnalysisError::CredentialMissing)?;
        let url = self.request_url(key)?;
        let body = serde_json::to_value(GenerateContentRequest::for_image(image))
            .map_err(|e| AnalysisError::Setup(e.to_string()))?;

        info!(
            endpoint = %self.base_url,
            model = %self.model,
            mime = image.mime(),
            "Submitting image for analysis"
        );
        debug!(bytes = image.byte_len(), "Analysis payload size");

        let transport = self.transport.as_ref();
        let (url, body) = (&url, &body);
        let outcome = retry_with_backoff(&self.policy, cancel, "analysis", move |_| {
            send_once(transport, url, body)
        })
        .await;

        match outcome {
            Ok(result) => {
                info!(classification = %result.classification, "Analysis complete");
                Ok(result)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                Err(AnalysisError::Exhausted { attempts, last })
            }
            Err(RetryError::Cancelled) => {
                debug!("Analysis cancelled");
                Err(AnalysisError::Cancelled)
            }
        }
    }
}

/// One request and its validation
async fn send_once(
    transport: &dyn Transport,
    url: &Url,
    body: &serde_json::Value,
) -> Result<AnalysisResult, AttemptError> {
    let response = transport
        .post_json(url, body)
        .await
        .map_err(|e| AttemptError::Network(e.to_string()))?;

    check_status(&response)?;
    parse_response(&response.body)
}

fn check_status(response: &TransportResponse) -> Result<(), AttemptError> {
    if response.is_success() {
        return Ok(());
    }
    let mut body = response.body.trim().to_string();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Err(AttemptError::Status {
        status: response.status,
        body,
    })
}

/// Extract and validate the structured output from a response body
pub fn parse_response(body: &str) -> Result<AnalysisResult, AttemptError> {
    if body.trim().is_empty() {
        return Err(AttemptError::MalformedResponse("empty body".to_string()));
    }

    let envelope: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AttemptError::MalformedResponse(format!("invalid envelope: {}", e)))?;

    let text = envelope
        .first_text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AttemptError::MalformedResponse("no text part in response".to_string()))?;

    serde_json::from_str(text)
        .map_err(|e| AttemptError::MalformedResponse(format!("invalid result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    #[test]
    fn test_parse_valid_response() {
        let body = envelope(r#"{"classification":"cat","description":"A cat."}"#);
        let result = parse_response(&body).unwrap();
        assert_eq!(result.classification, "cat");
        assert_eq!(result.description, "A cat.");
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!(matches!(
            parse_response(""),
            Err(AttemptError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response("<html>"),
            Err(AttemptError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(&envelope("not json")),
            Err(AttemptError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"candidates":[]}"#),
            Err(AttemptError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let body = envelope(r#"{"classification":"cat"}"#);
        assert!(matches!(
            parse_response(&body),
            Err(AttemptError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_status_body_truncated() {
        let response = TransportResponse {
            status: 503,
            body: "é".repeat(MAX_ERROR_BODY),
        };
        match check_status(&response) {
            Err(AttemptError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.len() <= MAX_ERROR_BODY);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_request_url_carries_key() {
        let config = Config {
            endpoint_url: "https://example.test/v1beta/".to_string(),
            model: "m".to_string(),
            api_key: Some("k 1".to_string()),
            ..Config::default()
        };
        let client = AnalysisClient::new(&config).unwrap();
        let url = client.request_url("k 1").unwrap();
        assert_eq!(url.path(), "/v1beta/models/m:generateContent");
        assert_eq!(url.query(), Some("key=k+1"));
    }
}
