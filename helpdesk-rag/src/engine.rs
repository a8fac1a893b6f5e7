//! Retrieval engine: guardrail → search → confidence → ledger.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::error::Result;
use crate::guardrail::{ContentFilter, GuardrailResult};
use crate::index::{CatalogueIndex, RetrievedCandidate};
use crate::ledger::{EvaluationLedger, QueryToken};
use crate::metrics::precision_at;

/// Reason a query was not answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// The guardrail blocked the text before any retrieval.
    Guardrail { reason: String },
    /// The best candidate's confidence fell below the threshold.
    LowRelevance { confidence: f32 },
}

impl Rejection {
    pub fn reason(&self) -> &str {
        match self {
            Rejection::Guardrail { reason } => reason,
            Rejection::LowRelevance { .. } => "low relevance",
        }
    }
}

/// Outcome of [`RetrievalEngine::answer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Answer {
    Answered {
        candidate: RetrievedCandidate,
        /// `(1 - distance) * 100`; not a calibrated probability.
        confidence: f32,
        /// Correlates later feedback with this query's ledger record.
        token: QueryToken,
    },
    Rejected(Rejection),
    NoMatch,
}

/// Linear transform of a distance into a percentage-like score.
///
/// Distances above 1 give negative confidence.
pub fn confidence_from_distance(distance: f32) -> f32 {
    (1.0 - distance) * 100.0
}

/// Answers free-text questions from the indexed catalogue.
///
/// The engine only appends to the ledger for answered queries; rejected and
/// unmatched queries leave no trace there.
pub struct RetrievalEngine {
    config: RagConfig,
    guardrail: ContentFilter,
    index: Arc<CatalogueIndex>,
    ledger: Arc<EvaluationLedger>,
}

impl RetrievalEngine {
    pub fn new(
        config: RagConfig,
        guardrail: ContentFilter,
        index: Arc<CatalogueIndex>,
        ledger: Arc<EvaluationLedger>,
    ) -> Self {
        Self { config, guardrail, index, ledger }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<EvaluationLedger> {
        &self.ledger
    }

    pub fn index(&self) -> &Arc<CatalogueIndex> {
        &self.index
    }

    /// Answer a query.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`](crate::RagError::EmbeddingError)
    /// if the query cannot be embedded, or a vector store error if search
    /// fails. Guardrail rejections, low relevance and empty results are
    /// `Ok` outcomes.
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        if let GuardrailResult::Fail { reason } = self.guardrail.check(query) {
            warn!(query_len = query.len(), "query blocked by guardrail");
            return Ok(Answer::Rejected(Rejection::Guardrail { reason }));
        }

        let candidates = self.index.search(query, self.config.top_k).await?;
        let Some(top) = candidates.first().cloned() else {
            info!("no candidates found");
            return Ok(Answer::NoMatch);
        };

        let confidence = confidence_from_distance(top.distance);
        if confidence < self.config.confidence_threshold {
            info!(
                top_id = %top.id,
                confidence,
                threshold = self.config.confidence_threshold,
                "query rejected as low relevance"
            );
            return Ok(Answer::Rejected(Rejection::LowRelevance { confidence }));
        }

        let retrieved_ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        let relevant_ids = BTreeSet::from([top.id.clone()]);
        debug!(
            precision_at_1 = precision_at(1, &retrieved_ids, &relevant_ids),
            precision_at_2 = precision_at(2, &retrieved_ids, &relevant_ids),
            precision_at_3 = precision_at(3, &retrieved_ids, &relevant_ids),
            retrieved = ?retrieved_ids,
            "provisional query metrics"
        );
        let token = self.ledger.record(query, retrieved_ids, relevant_ids).await;

        info!(
            top_id = %top.id,
            distance = top.distance,
            confidence,
            token = %token,
            "query answered"
        );
        let metrics = self.ledger.aggregate().await;
        info!(
            total_queries = metrics.total_queries,
            precision_at_1 = metrics.precision_at_1,
            precision_at_3 = metrics.precision_at_3,
            precision_at_5 = metrics.precision_at_5,
            mrr = metrics.mrr,
            "evaluation metrics"
        );

        Ok(Answer::Answered { candidate: top, confidence, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_linear_in_distance() {
        assert_eq!(confidence_from_distance(0.0), 100.0);
        assert!((confidence_from_distance(0.25) - 75.0).abs() < 1e-4);
        assert!(confidence_from_distance(1.2) < 0.0);
    }

    #[test]
    fn low_relevance_reason_text() {
        assert_eq!(Rejection::LowRelevance { confidence: -3.0 }.reason(), "low relevance");
    }
}
