use super::Embedder;
use crate::errors::Error;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use url::Url;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

/// OpenAI embedder implementation that uses an OpenAI-compatible API to generate text embeddings
#[derive(Debug)]
pub struct OpenAIEmbedder {
    /// API key used for authentication
    pub api_key: String,
    /// Name of the model to use for embeddings
    pub model: String,
    /// Expected vector length, checked on every response
    pub dimension: usize,
    endpoint: Url,
    client: Client,
}

impl OpenAIEmbedder {
    /// Creates a new OpenAIEmbedder instance
    ///
    /// # Arguments
    ///
    /// * `model` - Name of the model to use
    /// * `dimension` - Vector length the model produces
    /// * `api_base` - Base URL of the API, defaults to OpenAI's
    ///
    /// # Returns
    ///
    /// A Result containing either:
    /// * A new OpenAIEmbedder instance
    /// * An error if OPENAI_API_KEY is not set or the base URL is invalid
    pub fn new(model: &str, dimension: usize, api_base: Option<&str>) -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            Error::Embedding("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Self::with_api_key(api_key, model, dimension, api_base)
    }

    /// Same as [`OpenAIEmbedder::new`] with an explicit key
    pub fn with_api_key(
        api_key: String,
        model: &str,
        dimension: usize,
        api_base: Option<&str>,
    ) -> Result<Self, Error> {
        let base = api_base.unwrap_or(DEFAULT_OPENAI_API_BASE);
        let endpoint = Url::parse(base)
            .and_then(|u| u.join("embeddings"))
            .map_err(|e| Error::InvalidArgument(format!("invalid embedder url '{}': {}", base, e)))?;
        Ok(Self {
            api_key,
            model: model.to_string(),
            dimension,
            endpoint,
            client: Client::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embeds the given texts with a single API call
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "input": texts,
            "model": self.model
        });

        let res = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        if !res.status().is_success() {
            let txt = res.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("Error from OpenAI: {}", txt)));
        }

        let json_resp: serde_json::Value = res
            .json()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;
        let data = json_resp["data"]
            .as_array()
            .ok_or_else(|| Error::Embedding("No embedding".to_string()))?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let arr = item["embedding"]
                .as_array()
                .ok_or_else(|| Error::Embedding("No embedding".to_string()))?;
            let embedding: Vec<f32> = arr
                .iter()
                .filter_map(|x| x.as_f64())
                .map(|x| x as f32)
                .collect();
            if embedding.len() != self.dimension {
                return Err(Error::Embedding(format!(
                    "expected {} dimensions, got {}",
                    self.dimension,
                    embedding.len()
                )));
            }
            embeddings.push(embedding);
        }

        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "requested {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoint_from_base_url() {
        let embedder = OpenAIEmbedder::with_api_key(
            "key".to_string(),
            "text-embedding-3-small",
            1536,
            Some("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(
            embedder.endpoint().as_str(),
            "http://localhost:8080/v1/embeddings"
        );
    }

    #[test]
    fn rejects_malformed_base_url() {
        let result = OpenAIEmbedder::with_api_key("key".to_string(), "m", 8, Some("not a url"));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
