//! Local ONNX Runtime embedding provider.
//!
//! Implements [`EmbeddingProvider`] with all-MiniLM-L6-v2 via `ort`:
//! tokenization, inference, attention-masked mean pooling, L2 normalization.
//! Pooling accumulates in `f64` so vectors come out in the engine's precision.

use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;
use crate::knowledge::vector::l2_normalize;

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync and the Session is only reached through the Mutex.
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let model_path = cache_dir.join("model.onnx");
        let tokenizer_path = cache_dir.join("tokenizer.json");

        anyhow::ensure!(
            model_path.exists() && tokenizer_path.exists(),
            "embedding model files missing in {}. Run `tessera model download` first.",
            cache_dir.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(model = %config.model, dir = %cache_dir.display(), "embedding model loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f64>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .context("embedding batch returned no vector")
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f64>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))?;
        let mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))?;
        // Single segment: token_type_ids are all zero.
        let type_tensor = Tensor::from_array((shape, vec![0i64; batch_size * seq_len].into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;

        let outputs = session.run(ort::inputs! {
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "token_type_ids" => type_tensor,
        })?;

        // Output name varies by export.
        let hidden = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (dims, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings")?;
        let dims: &[i64] = &dims;
        anyhow::ensure!(
            dims.len() == 3 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected token embedding shape {dims:?}, expected [batch, seq, {EMBEDDING_DIM}]"
        );
        let hidden_dim = dims[2] as usize;
        let out_seq_len = dims[1] as usize;

        let mut results = Vec::with_capacity(batch_size);
        for b in 0..batch_size {
            let mut pooled = vec![0.0f64; hidden_dim];
            let mut count = 0.0f64;
            for s in 0..out_seq_len {
                if attention_mask[b * seq_len + s] == 0 {
                    continue;
                }
                let offset = (b * out_seq_len + s) * hidden_dim;
                for (d, slot) in pooled.iter_mut().enumerate() {
                    *slot += f64::from(data[offset + d]);
                }
                count += 1.0;
            }
            if count > 0.0 {
                pooled.iter_mut().for_each(|x| *x /= count);
            }
            results.push(l2_normalize(&pooled));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::vector::similarity;

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig::default()
    }

    #[test]
    fn missing_model_files_report_download_hint() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = EmbeddingConfig {
            cache_dir: tmp.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let err = LocalEmbeddingProvider::new(&config).err().unwrap();
        assert!(err.to_string().contains("tessera model download"));
    }

    #[test]
    #[ignore] // Requires model files. Run with: cargo test -- --ignored
    fn embeds_to_unit_vectors_of_model_dimension() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let v = provider.embed("Sprint planning notes").unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    #[ignore]
    fn similar_texts_score_higher() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let a = provider.embed("We agreed to ship the release on Friday").unwrap();
        let b = provider.embed("The release ships Friday as agreed").unwrap();
        let c = provider.embed("Photosynthesis converts light into energy").unwrap();
        assert!(similarity(&a, &b) > similarity(&a, &c));
    }
}
