//! OpenAI-compatible embeddings over HTTP.
//!
//! `POST {base_url}/embeddings` with `{ model, input: [...] }`, bearer auth.
//! The response's `data[].index` is used to restore input order.

use super::{EmbeddingProvider, ProviderConfig};
use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub(super) const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub(super) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| VectorStoreError::InvalidConfig("OpenAI API key is not set".into()))?
            .to_string();

        let model = if config.model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        let base_url = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.trim()
        };

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> VectorStoreError {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| body.to_string());
        VectorStoreError::provider(format!("embedding request failed ({status}): {message}"))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| VectorStoreError::provider(format!("embedding request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VectorStoreError::provider(format!("reading embedding response: {e}")))?;
        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| VectorStoreError::provider(format!("parsing embedding response: {e}")))?;
        order_by_index(parsed.data, texts.len())
    }
}

fn order_by_index(data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        let slot = slots.get_mut(item.index).ok_or_else(|| {
            VectorStoreError::provider(format!(
                "embedding index {} out of range for {expected} inputs",
                item.index
            ))
        })?;
        *slot = Some(item.embedding);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| VectorStoreError::provider(format!("missing embedding for input {i}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            api_key: key.map(str::to_string),
            base_url: "http://localhost:8080/v1/".into(),
            ..Default::default()
        }
    }

    #[test]
    fn requires_an_api_key() {
        assert!(matches!(
            OpenAiEmbeddingProvider::new(&config(None)),
            Err(VectorStoreError::InvalidConfig(_))
        ));
        assert!(OpenAiEmbeddingProvider::new(&config(Some("  "))).is_err());
    }

    #[test]
    fn builds_endpoint_from_base_url() {
        let provider = OpenAiEmbeddingProvider::new(&config(Some("sk-test"))).expect("provider");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
        assert_eq!(provider.model_id(), DEFAULT_MODEL);
    }

    #[test]
    fn response_is_reordered_by_index() {
        let body = r#"{"data":[{"embedding":[2.0],"index":1},{"embedding":[1.0],"index":0}],"model":"m"}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).expect("parse");
        let vectors = order_by_index(parsed.data, 2).expect("ordered");
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn missing_or_stray_indexes_are_errors() {
        let missing = vec![EmbeddingData {
            embedding: vec![1.0],
            index: 0,
        }];
        assert!(order_by_index(missing, 2).is_err());

        let stray = vec![EmbeddingData {
            embedding: vec![1.0],
            index: 5,
        }];
        assert!(order_by_index(stray, 1).is_err());
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let err = OpenAiEmbeddingProvider::http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"bad key"}}"#,
        );
        assert!(err.to_string().contains("bad key"));
    }
}
