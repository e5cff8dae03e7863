use crate::azure::{AzureError, AzureTransport};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Transport or service-level failure.
    #[error(transparent)]
    Azure(#[from] AzureError),
    /// Provider response could not be decoded or did not line up with the request.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
///
/// Implementations return exactly one vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Azure OpenAI embeddings adapter.
///
/// The embedding model name doubles as the deployment name, matching how Azure resources are
/// usually provisioned (`text-embedding-3-small` deployed as `text-embedding-3-small`).
pub struct AzureEmbeddingClient {
    transport: AzureTransport,
    deployment: String,
}

impl AzureEmbeddingClient {
    /// Construct a client that targets `deployment` on the given transport.
    pub fn new(transport: AzureTransport, deployment: impl Into<String>) -> Self {
        Self {
            transport,
            deployment: deployment.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for AzureEmbeddingClient {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let expected = texts.len();
        tracing::debug!(
            deployment = %self.deployment,
            inputs = expected,
            "Generating embeddings"
        );

        let payload = json!({ "input": texts });
        let response = self
            .transport
            .post_json(&self.deployment, "embeddings", &payload)
            .await?;
        let body: EmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode embeddings response: {error}"
            ))
        })?;

        order_embeddings(body.data, expected)
    }
}

/// Reassemble vectors in request order and validate their shape.
fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
    if data.len() != expected {
        return Err(EmbeddingClientError::InvalidResponse(format!(
            "expected {expected} vectors, received {}",
            data.len()
        )));
    }

    data.sort_by_key(|item| item.index);
    if data.iter().enumerate().any(|(position, item)| item.index != position) {
        return Err(EmbeddingClientError::InvalidResponse(
            "response indexes do not cover the request".into(),
        ));
    }

    let dimension = data.first().map(|item| item.embedding.len()).unwrap_or(0);
    if dimension == 0 || data.iter().any(|item| item.embedding.len() != dimension) {
        return Err(EmbeddingClientError::InvalidResponse(
            "vectors are empty or of differing dimensions".into(),
        ));
    }

    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::test_transport;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn azure_client_restores_request_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/text-embedding-3-small/embeddings")
                    .query_param("api-version", "2024-02-01")
                    .json_body(json!({ "input": ["first", "second"] }));
                then.status(200).json_body(json!({
                    "object": "list",
                    "data": [
                        { "object": "embedding", "index": 1, "embedding": [0.0, 1.0] },
                        { "object": "embedding", "index": 0, "embedding": [1.0, 0.0] }
                    ],
                    "model": "text-embedding-3-small"
                }));
            })
            .await;

        let client = AzureEmbeddingClient::new(
            test_transport(&server.base_url()),
            "text-embedding-3-small",
        );
        let vectors = client
            .embed(vec!["first".into(), "second".into()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn azure_client_surfaces_service_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).body("rate limited");
            })
            .await;

        let client = AzureEmbeddingClient::new(test_transport(&server.base_url()), "emb");
        let error = client
            .embed(vec!["text".into()])
            .await
            .expect_err("quota error");
        assert!(matches!(
            error,
            EmbeddingClientError::Azure(AzureError::UnexpectedStatus { .. })
        ));
        assert!(error.to_string().contains("429"));
    }

    #[tokio::test]
    async fn azure_client_rejects_empty_input_without_calling_service() {
        let client = AzureEmbeddingClient::new(test_transport("http://127.0.0.1:9"), "emb");
        let error = client.embed(Vec::new()).await.expect_err("empty input");
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }

    #[test]
    fn order_embeddings_rejects_count_mismatch() {
        let data = vec![EmbeddingData {
            index: 0,
            embedding: vec![1.0],
        }];
        let error = order_embeddings(data, 2).expect_err("mismatch");
        assert!(matches!(error, EmbeddingClientError::InvalidResponse(_)));
    }

    #[test]
    fn order_embeddings_rejects_ragged_vectors() {
        let data = vec![
            EmbeddingData {
                index: 0,
                embedding: vec![1.0, 0.0],
            },
            EmbeddingData {
                index: 1,
                embedding: vec![1.0],
            },
        ];
        assert!(order_embeddings(data, 2).is_err());
    }
}
