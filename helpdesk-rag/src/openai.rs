//! Embeddings from an OpenAI-compatible `/embeddings` endpoint.
//!
//! Enabled by the `openai` feature. The base URL is configurable, so Azure
//! OpenAI proxies and self-hosted compatible servers work the same way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Vector size of [`DEFAULT_MODEL`] when no truncation is requested.
const DEFAULT_MODEL_DIMENSIONS: usize = 1536;

const PROVIDER: &str = "OpenAI";

/// Embeds catalogue issues and user questions through an embeddings API.
///
/// Every returned vector is checked against [`dimensions`](EmbeddingProvider::dimensions)
/// so a model/size mismatch fails at indexing time instead of inside the store.
///
/// ```rust,ignore
/// use helpdesk_rag::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_env()?.with_dimensions(512);
/// let vector = provider.embed("vpn keeps disconnecting").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    requested_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(provider_error("API key must not be empty"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_MODEL_DIMENSIONS,
            requested_dimensions: None,
        })
    }

    /// Read the key from `OPENAI_API_KEY` and, if set, the endpoint from `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| provider_error("OPENAI_API_KEY is not set"))?;
        let provider = Self::new(api_key)?;
        Ok(match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => provider.with_base_url(url),
            _ => provider,
        })
    }

    /// Point at another OpenAI-compatible server, e.g. `http://localhost:8080/v1`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ask the API for vectors of `dims` components.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.requested_dimensions = Some(dims);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

fn provider_error(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Place each item at its `index`, requiring exactly one vector per input.
fn ordered_vectors(
    items: Vec<EmbeddingItem>,
    expected: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
    if items.len() != expected {
        return Err(provider_error(format!(
            "expected {expected} embeddings, got {}",
            items.len()
        )));
    }
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in items {
        if item.embedding.len() != dimensions {
            return Err(provider_error(format!(
                "embedding {} has {} dimensions, expected {dimensions}",
                item.index,
                item.embedding.len()
            )));
        }
        let Some(slot) = slots.get_mut(item.index) else {
            return Err(provider_error(format!("embedding index {} out of range", item.index)));
        };
        if slot.is_some() {
            return Err(provider_error(format!("duplicate embedding index {}", item.index)));
        }
        *slot = Some(item.embedding);
    }
    // lengths matched and no index repeated, so every slot is filled
    Ok(slots.into_iter().flatten().collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| provider_error("no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(position) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(provider_error(format!("input {position} is empty")));
        }

        debug!(provider = PROVIDER, inputs = texts.len(), model = %self.model, "embedding batch");

        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions,
        };
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embeddings request failed");
                provider_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            error!(provider = PROVIDER, %status, "embeddings API error");
            return Err(provider_error(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "unreadable embeddings response");
            provider_error(format!("failed to parse response: {e}"))
        })?;
        ordered_vectors(parsed.data, texts.len(), self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Answer a single HTTP request with `status` and `body`; yields the raw request.
    async fn stub_server(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        });
        (format!("http://{addr}/v1"), handle)
    }

    fn provider(base_url: &str) -> OpenAIEmbeddingProvider {
        OpenAIEmbeddingProvider::new("sk-test").unwrap().with_base_url(base_url).with_dimensions(2)
    }

    #[tokio::test]
    async fn vectors_follow_input_order_not_response_order() {
        let body = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0]},
            {"index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        let (base_url, server) = stub_server("200 OK", body.to_string()).await;

        let vectors =
            provider(&base_url).embed_batch(&["wifi down", "printer jam"]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /v1/embeddings "));
        assert!(request.contains("authorization: bearer sk-test"));
        assert!(request.contains(r#""dimensions":2"#));
        assert!(request.contains(r#""input":["wifi down","printer jam"]"#));
    }

    #[tokio::test]
    async fn short_response_is_an_embedding_error() {
        let body = r#"{"data": [{"index": 0, "embedding": [1.0, 0.0]}]}"#;
        let (base_url, server) = stub_server("200 OK", body.to_string()).await;

        let err =
            provider(&base_url).embed_batch(&["wifi down", "printer jam"]).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::EmbeddingError { ref message, .. } if message.contains("expected 2")
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn api_error_message_is_surfaced() {
        let body = r#"{"error": {"message": "Incorrect API key provided"}}"#;
        let (base_url, server) = stub_server("401 Unauthorized", body.to_string()).await;

        let err = provider(&base_url).embed("wifi down").await.unwrap_err();
        let RagError::EmbeddingError { provider, message } = err else {
            panic!("expected an embedding error");
        };
        assert_eq!(provider, "OpenAI");
        assert!(message.contains("401"));
        assert!(message.contains("Incorrect API key provided"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn blank_input_fails_before_any_request() {
        // nothing listens here; reaching the network would surface a request error instead
        let provider = provider("http://127.0.0.1:9/v1");
        let err = provider.embed_batch(&["vpn", "  "]).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::EmbeddingError { ref message, .. } if message == "input 1 is empty"
        ));
    }

    #[test]
    fn duplicate_or_out_of_range_indices_are_rejected() {
        let item =
            |index, embedding: &[f32]| EmbeddingItem { index, embedding: embedding.to_vec() };

        let duplicate = vec![item(0, &[1.0, 0.0]), item(0, &[0.0, 1.0])];
        assert!(ordered_vectors(duplicate, 2, 2).is_err());

        let out_of_range = vec![item(0, &[1.0, 0.0]), item(5, &[0.0, 1.0])];
        assert!(ordered_vectors(out_of_range, 2, 2).is_err());

        let wrong_size = vec![item(0, &[1.0, 0.0, 0.0])];
        assert!(ordered_vectors(wrong_size, 1, 2).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let provider = provider("http://localhost:8080/v1/");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
    }
}
