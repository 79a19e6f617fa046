use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::RerankingService;
use crate::domain::{OracleError, OracleResult, RetrievedChunk};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_ATTEMPTS: u32 = 3;

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: Vec<&'a str>,
}

#[derive(Deserialize)]
struct RerankResponse {
    scores: Vec<f32>,
}

/// Vendor-neutral HTTP reranker (spec §4.9 `Remote` variant). POSTs
/// `{query, documents}` to a configured endpoint and expects back
/// `{scores}` in input order. Retries transient failures with a fixed
/// backoff; a caller wanting a specific vendor's wire format wraps this
/// with its own client rather than this crate growing one.
pub struct RemoteReranking {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
    model_name: String,
}

impl RemoteReranking {
    pub fn new(endpoint: impl Into<String>, bearer_token: Option<String>) -> OracleResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| OracleError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            bearer_token,
            model_name: "remote-reranker".to_string(),
        })
    }

    async fn score(&self, query: &str, documents: &[&str]) -> OracleResult<Vec<f32>> {
        let body = RerankRequest { query, documents: documents.to_vec() };

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self.client.post(&self.endpoint).json(&body);
            if let Some(token) = &self.bearer_token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let parsed: RerankResponse = response
                        .json()
                        .await
                        .map_err(|e| OracleError::transient_external(format!("invalid response body: {e}")))?;
                    return Ok(parsed.scores);
                }
                Ok(response) => {
                    warn!(attempt, status = %response.status(), "remote reranker returned an error status");
                    last_err = Some(OracleError::transient_external(format!(
                        "remote reranker returned status {}",
                        response.status()
                    )));
                }
                Err(e) => {
                    warn!(attempt, error = %e, "remote reranker request failed");
                    last_err = Some(OracleError::transient_external(format!("request failed: {e}")));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| OracleError::internal("remote reranker exhausted retries")))
    }
}

#[async_trait]
impl RerankingService for RemoteReranking {
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

        let documents: Vec<&str> = candidates.iter().map(|c| c.content()).collect();
        let scores = self.score(query, &documents).await?;

        if scores.len() != candidates.len() {
            return Err(OracleError::corrupt(
                "remote reranker returned a different number of scores than candidates",
            ));
        }

        debug!(count = candidates.len(), "remote rerank complete");
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
