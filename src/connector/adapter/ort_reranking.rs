use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::application::RerankingService;
use crate::domain::{OracleError, OracleResult, RetrievedChunk};

const DEFAULT_MODEL_ID: &str = "mixedbread-ai/mxbai-rerank-xsmall-v1";
const DEFAULT_MAX_SEQ_LENGTH: usize = 512;
const BATCH_SIZE: usize = 32;

/// Local cross-encoder reranker (spec §4.9 `Local` variant): one ONNX
/// forward pass per (query, candidate) pair, first logit through a
/// sigmoid as a bounded relevance score.
pub struct OrtReranking {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
}

impl OrtReranking {
    pub fn new(model_id: Option<&str>) -> OracleResult<Self> {
        let model_id = model_id.unwrap_or(DEFAULT_MODEL_ID);
        info!(model_id, "initializing ORT reranking service");

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
        info!(?model_path, "loading ONNX reranking model");

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
        })
    }

    fn score_batch(&self, query: &str, documents: &[&str]) -> OracleResult<Vec<f32>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let batch_size = documents.len();
        let pairs: Vec<(&str, &str)> = documents.iter().map(|doc| (query, *doc)).collect();

        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| OracleError::internal(format!("tokenization failed: {e}")))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(DEFAULT_MAX_SEQ_LENGTH);

        let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_len);

            input_ids.extend(ids[..len].iter().map(|&x| x as i64));
            attention_mask.extend(mask[..len].iter().map(|&x| x as i64));

            let padding = max_len - len;
            input_ids.extend(std::iter::repeat_n(0i64, padding));
            attention_mask.extend(std::iter::repeat_n(0i64, padding));
        }

        let shape = [batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape, input_ids))
            .map_err(|e| OracleError::internal(format!("failed to build input_ids tensor: {e}")))?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
            .map_err(|e| OracleError::internal(format!("failed to build attention_mask tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| OracleError::internal("reranking session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
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
        debug!(?shape, "reranking output tensor shape");

        let scores = if shape.len() == 2 && shape[1] == 1 {
            data.iter().take(batch_size).map(|&logit| sigmoid(logit)).collect()
        } else if shape.len() == 1 {
            data.iter().take(batch_size).map(|&logit| sigmoid(logit)).collect()
        } else {
            return Err(OracleError::internal(format!(
                "unexpected output tensor shape: {shape:?}"
            )));
        };

        Ok(scores)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn format_document(chunk: &RetrievedChunk) -> String {
    if chunk.symbol_name().is_empty() {
        chunk.content().to_string()
    } else {
        format!("{} {}", chunk.symbol_name(), chunk.content())
    }
}

#[async_trait]
impl RerankingService for OrtReranking {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedChunk>,
        top_n: usize,
    ) -> OracleResult<Vec<RetrievedChunk>> {
        if candidates.is_empty() {
            return Ok(vec![]);
        }
        if candidates.len() <= top_n {
            debug!(count = candidates.len(), top_n, "candidate count at or below top_n, bypassing the model");
            return Ok(candidates.iter().map(|c| c.with_score(1.0)).collect());
        }

        info!(count = candidates.len(), "reranking candidates");

        let documents: Vec<String> = candidates.iter().map(format_document).collect();
        let doc_refs: Vec<&str> = documents.iter().map(|s| s.as_str()).collect();

        let mut scores = Vec::with_capacity(candidates.len());
        for batch in doc_refs.chunks(BATCH_SIZE) {
            scores.extend(self.score_batch(query, batch)?);
        }

        let mut scored: Vec<RetrievedChunk> = candidates
            .iter()
            .zip(scores)
            .map(|(chunk, score)| chunk.with_score(score))
            .collect();

        scored.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_bounds_scores_between_zero_and_one() {
        assert!(sigmoid(-10.0) > 0.0 && sigmoid(-10.0) < 0.01);
        assert!(sigmoid(10.0) < 1.0 && sigmoid(10.0) > 0.99);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }
}
