use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::application::EmbeddingService;
use crate::domain::{OracleError, OracleResult};

const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_DIMENSIONS: usize = 384;
const DEFAULT_MAX_SEQ_LENGTH: usize = 256;
const BATCH_SIZE: usize = 32;

/// ONNX Runtime embedder: mean-pooled, L2-normalized sentence embeddings
/// (spec §4.6). Loads weights and tokenizer via `hf-hub` on construction.
pub struct OrtEmbedding {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimensions: usize,
}

impl OrtEmbedding {
    pub fn new(model_id: Option<&str>) -> OracleResult<Self> {
        let model_id = model_id.unwrap_or(DEFAULT_MODEL_ID);
        info!(model_id, "initializing ORT embedding service");

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_progress(true)
            .build()
            .map_err(|e| OracleError::model_unavailable(format!("failed to create HF API: {e}")))?;

        let repo = api.model(model_id.to_string());

        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| OracleError::model_unavailable(format!("failed to download tokenizer: {e}")))?;

        let model_path = repo
            .get("model.onnx")
            .or_else(|_| repo.get("onnx/model.onnx"))
            .map_err(|e| OracleError::model_unavailable(format!("failed to download ONNX model: {e}")))?;

        Self::from_paths(model_path, tokenizer_path, model_id)
    }

    pub fn from_paths(model_path: PathBuf, tokenizer_path: PathBuf, model_name: &str) -> OracleResult<Self> {
        info!(?model_path, "loading ONNX model");

        let session = Session::builder()
            .map_err(|e| OracleError::internal(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| OracleError::internal(format!("failed to set optimization level: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| OracleError::model_unavailable(format!("failed to load ONNX model: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| OracleError::model_unavailable(format!("failed to load tokenizer: {e}")))?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name: model_name.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    fn embed_texts(&self, texts: &[&str]) -> OracleResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| OracleError::internal(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(DEFAULT_MAX_SEQ_LENGTH);

        let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let type_ids = encoding.get_type_ids();

            let len = ids.len().min(max_len);

            input_ids.extend(ids[..len].iter().map(|&x| x as i64));
            attention_mask.extend(mask[..len].iter().map(|&x| x as i64));
            token_type_ids.extend(type_ids[..len].iter().map(|&x| x as i64));

            let padding = max_len - len;
            input_ids.extend(std::iter::repeat_n(0i64, padding));
            attention_mask.extend(std::iter::repeat_n(0i64, padding));
            token_type_ids.extend(std::iter::repeat_n(0i64, padding));
        }

        let shape = [batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape, input_ids))
            .map_err(|e| OracleError::internal(format!("failed to build input_ids tensor: {e}")))?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
            .map_err(|e| OracleError::internal(format!("failed to build attention_mask tensor: {e}")))?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids))
            .map_err(|e| OracleError::internal(format!("failed to build token_type_ids tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| OracleError::internal("embedding session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            ])
            .map_err(|e| OracleError::internal(format!("inference failed: {e}")))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| OracleError::internal("no output tensor found"))?;

        let (shape, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| OracleError::internal(format!("failed to extract output tensor: {e}")))?;

        let shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
        debug!(?shape, "embedding output tensor shape");

        let embeddings = match shape.len() {
            3 => {
                let hidden_size = shape[2];
                let seq_len = shape[1];
                (0..batch_size)
                    .map(|i| {
                        let mut embedding = vec![0.0f32; hidden_size];
                        let mut count = 0.0f32;
                        let mask = encodings[i].get_attention_mask();
                        for j in 0..seq_len.min(max_len) {
                            let mask_val = if j < mask.len() { mask[j] as f32 } else { 0.0 };
                            if mask_val > 0.0 {
                                for (k, emb_k) in embedding.iter_mut().enumerate().take(hidden_size) {
                                    let idx = i * seq_len * hidden_size + j * hidden_size + k;
                                    *emb_k += data[idx] * mask_val;
                                }
                                count += mask_val;
                            }
                        }
                        normalize(&mut embedding, count);
                        embedding
                    })
                    .collect()
            }
            2 => {
                let hidden_size = shape[1];
                (0..batch_size)
                    .map(|i| {
                        let mut embedding: Vec<f32> =
                            (0..hidden_size).map(|j| data[i * hidden_size + j]).collect();
                        normalize(&mut embedding, 1.0);
                        embedding
                    })
                    .collect()
            }
            _ => {
                return Err(OracleError::internal(format!(
                    "unexpected output tensor shape: {shape:?}"
                )))
            }
        };

        Ok(embeddings)
    }
}

fn normalize(embedding: &mut [f32], pool_count: f32) {
    if pool_count > 0.0 {
        for v in embedding.iter_mut() {
            *v /= pool_count;
        }
    }
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in embedding.iter_mut() {
            *v /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingService for OrtEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> OracleResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let refs: Vec<&str> = batch.iter().map(|s| s.as_str()).collect();
            all_embeddings.extend(self.embed_texts(&refs)?);
        }
        Ok(all_embeddings)
    }

    async fn embed_query(&self, query: &str) -> OracleResult<Vec<f32>> {
        self.embed_texts(&[query])?
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::internal("failed to generate query embedding"))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires model download"]
    async fn embeds_a_query_at_the_configured_dimensionality() {
        let service = OrtEmbedding::new(None).expect("failed to create service");
        let embedding = service
            .embed_query("fn main() { println!(\"Hello\"); }")
            .await
            .unwrap();
        assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }
}
