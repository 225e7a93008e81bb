/// Module for the deterministic local embedder
pub mod hashing_embedder;
/// Module for OpenAI embedder implementation
pub mod openai_embedder;

use crate::config::{EmbedderConfig, EmbedderProvider};
use crate::errors::Error;
use async_trait::async_trait;
use std::sync::Arc;

pub use hashing_embedder::*;
pub use openai_embedder::*;

/// Trait defining interface for text embedding functionality
///
/// Every vector an embedder returns has exactly `dimension()` components.
#[async_trait]
pub trait Embedder: std::fmt::Debug + Send + Sync {
    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts, one vector per text in input order
    ///
    /// # Arguments
    ///
    /// * `texts` - The texts to embed
    ///
    /// # Returns
    ///
    /// A Result containing either:
    /// * One vector of `dimension()` f32 values per text
    /// * An `Embedding` error if embedding fails
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error>;

    /// Embeds a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, Error> {
        let mut vectors = self.embed_texts(&[text.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("embedder returned no vector".to_string()))?;
        if vector.len() != self.dimension() {
            return Err(Error::Embedding(format!(
                "expected {} dimensions, got {}",
                self.dimension(),
                vector.len()
            )));
        }
        Ok(vector)
    }
}

/// Builds the embedder selected by `config`
///
/// # Errors
/// Returns an error if the dimension is zero, or for `openai` if
/// OPENAI_API_KEY is missing or the base URL is invalid
pub fn embedder_from_config(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>, Error> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbedderProvider::Hashing => Arc::new(HashingEmbedder::new(config.dimension)?),
        EmbedderProvider::Openai => Arc::new(OpenAIEmbedder::new(
            &config.model,
            config.dimension,
            config.api_base.as_deref(),
        )?),
    };
    Ok(embedder)
}
