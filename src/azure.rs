//! Shared HTTP transport for Azure OpenAI deployments.
//!
//! Both the embedding and chat adapters talk to the same resource: a base endpoint, an
//! `api-key` header, and an `api-version` query parameter appended to every deployment route.

use crate::config::Config;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors returned while talking to Azure OpenAI.
#[derive(Debug, Error)]
pub enum AzureError {
    /// Endpoint could not be normalized into a usable base URL.
    #[error("Invalid Azure OpenAI endpoint: {0}")]
    InvalidEndpoint(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Azure responded with a non-success status code.
    #[error("Unexpected Azure OpenAI response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Connection settings for a single Azure OpenAI resource.
#[derive(Debug, Clone)]
pub struct AzureSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    /// Key sent in the `api-key` header.
    pub api_key: String,
    /// REST API version.
    pub api_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl AzureSettings {
    /// Derive transport settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.azure_openai_endpoint.clone(),
            api_key: config.azure_openai_api_key.clone(),
            api_version: config.api_version.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Thin wrapper around `reqwest` that knows how to address deployments.
#[derive(Clone)]
pub struct AzureTransport {
    client: Client,
    base_url: String,
    api_key: String,
    api_version: String,
}

impl AzureTransport {
    /// Build a transport for the given settings.
    pub fn new(settings: AzureSettings) -> Result<Self, AzureError> {
        let client = Client::builder()
            .user_agent(concat!("pdfchat/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()?;
        let base_url = normalize_base_url(&settings.endpoint).map_err(AzureError::InvalidEndpoint)?;
        tracing::debug!(
            url = %base_url,
            api_version = %settings.api_version,
            has_api_key = !settings.api_key.is_empty(),
            "Initialized Azure OpenAI transport"
        );

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key,
            api_version: settings.api_version,
        })
    }

    /// URL for an operation on a deployment, e.g. `embeddings` or `chat/completions`.
    pub(crate) fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}",
            self.base_url,
            deployment.trim_matches('/'),
            operation.trim_start_matches('/')
        )
    }

    /// POST a JSON body to a deployment operation and return the successful response.
    pub(crate) async fn post_json<B>(
        &self,
        deployment: &str,
        operation: &str,
        body: &B,
    ) -> Result<Response, AzureError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.deployment_url(deployment, operation);
        tracing::trace!(%url, "Sending Azure OpenAI request");
        let response = self
            .client
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, AzureError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, body = %body, "Azure OpenAI request failed");
    Err(AzureError::UnexpectedStatus { status, body })
}

fn normalize_base_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("endpoint is empty".to_string());
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(format!("endpoint must start with http:// or https://: {trimmed}"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
pub(crate) fn test_transport(base_url: &str) -> AzureTransport {
    AzureTransport::new(AzureSettings {
        endpoint: base_url.to_string(),
        api_key: "test-key".into(),
        api_version: "2024-02-01".into(),
        timeout: Duration::from_secs(5),
    })
    .expect("transport")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    #[test]
    fn deployment_url_joins_segments() {
        let transport = test_transport("https://example.openai.azure.com/");
        assert_eq!(
            transport.deployment_url("gpt-4o", "chat/completions"),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions"
        );
    }

    #[test]
    fn rejects_endpoint_without_scheme() {
        let error = AzureTransport::new(AzureSettings {
            endpoint: "example.openai.azure.com".into(),
            api_key: "k".into(),
            api_version: "v".into(),
            timeout: Duration::from_secs(1),
        })
        .err()
        .expect("invalid endpoint");
        assert!(matches!(error, AzureError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn post_json_sends_key_and_api_version() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/dep/embeddings")
                    .query_param("api-version", "2024-02-01")
                    .header("api-key", "test-key");
                then.status(200).json_body(json!({ "ok": true }));
            })
            .await;

        let transport = test_transport(&server.base_url());
        transport
            .post_json("dep", "embeddings", &json!({ "input": ["x"] }))
            .await
            .expect("success");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(401).body("access denied");
            })
            .await;

        let transport = test_transport(&server.base_url());
        let error = transport
            .post_json("dep", "embeddings", &json!({}))
            .await
            .expect_err("unauthorized");
        match error {
            AzureError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "access denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
