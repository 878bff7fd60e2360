//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a local implementation using
//! all-MiniLM-L6-v2 (384 dimensions, L2-normalized). The provider is created
//! via [`create_provider`] from configuration.

pub mod local;

use anyhow::Result;

use crate::error::CoreError;

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// All methods are synchronous; callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f64>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f64>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// `"local"` loads ONNX Runtime + all-MiniLM-L6-v2 and errors if the model
/// files are missing (run `tessera model download` first). `"none"` disables
/// embeddings, which turns off related links and semantic search.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Option<Box<dyn EmbeddingProvider>>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Some(Box::new(provider)))
        }
        "none" => Ok(None),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local, none"),
    }
}

/// Embed `text`, or explain why no vector is available.
pub fn try_embed(
    provider: Option<&dyn EmbeddingProvider>,
    text: &str,
) -> Result<Vec<f64>, CoreError> {
    let provider = provider
        .ok_or_else(|| CoreError::EmbeddingUnavailable("no embedding provider configured".into()))?;
    let vector = provider
        .embed(text)
        .map_err(|e| CoreError::EmbeddingUnavailable(format!("{e:#}")))?;
    if vector.is_empty() || vector.iter().any(|x| !x.is_finite()) {
        return Err(CoreError::EmbeddingUnavailable(
            "provider returned an empty or non-finite vector".into(),
        ));
    }
    Ok(vector)
}

/// Like [`try_embed`], but logs the failure and degrades to `None`.
pub fn embed_optional(provider: Option<&dyn EmbeddingProvider>, text: &str) -> Option<Vec<f64>> {
    match try_embed(provider, text) {
        Ok(vector) => Some(vector),
        Err(e) => {
            tracing::warn!(error = %e, "continuing without embedding");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f64>);

    impl EmbeddingProvider for Fixed {
        fn embed(&self, _text: &str) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn missing_provider_is_unavailable() {
        let err = try_embed(None, "hello").unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingUnavailable(_)));
        assert!(embed_optional(None, "hello").is_none());
    }

    #[test]
    fn non_finite_vector_is_rejected() {
        let provider = Fixed(vec![1.0, f64::NAN]);
        assert!(try_embed(Some(&provider), "x").is_err());
        let empty = Fixed(Vec::new());
        assert!(embed_optional(Some(&empty), "x").is_none());
    }

    #[test]
    fn default_batch_embeds_each_text() {
        let provider = Fixed(vec![0.5, 0.5]);
        let out = provider.embed_batch(&["a", "b", "c"]).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(provider.dimensions(), EMBEDDING_DIM);
    }

    #[test]
    fn none_provider_disables_embeddings() {
        let config = crate::config::EmbeddingConfig {
            provider: "none".into(),
            ..Default::default()
        };
        assert!(create_provider(&config).unwrap().is_none());

        let bogus = crate::config::EmbeddingConfig {
            provider: "bogus".into(),
            ..Default::default()
        };
        assert!(create_provider(&bogus).is_err());
    }
}
