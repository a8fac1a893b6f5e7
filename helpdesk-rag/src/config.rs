//! Configuration for indexing and answering.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::inmemory::DistanceMetric;

/// Configuration parameters for the retrieval core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of candidates retrieved per query.
    pub top_k: usize,
    /// Number of catalogue entries embedded and stored per indexing batch.
    pub batch_size: usize,
    /// Answers whose confidence falls below this value are rejected as
    /// low relevance. Confidence is `(1 - distance) * 100`.
    pub confidence_threshold: f32,
    /// Vector store collection holding the catalogue embeddings.
    pub collection: String,
    /// Distance metric used by the in-memory vector store.
    pub distance_metric: DistanceMetric,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            batch_size: 100,
            confidence_threshold: 0.0,
            collection: "it_support".to_string(),
            distance_metric: DistanceMetric::Cosine,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of candidates retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the indexing batch size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the minimum confidence for an answer to be shown.
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    /// Set the vector store collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the distance metric.
    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.config.distance_metric = metric;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0`
    /// - `batch_size == 0`
    /// - `confidence_threshold` is not finite
    /// - `collection` is empty
    pub fn build(self) -> Result<RagConfig> {
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }
        if !self.config.confidence_threshold.is_finite() {
            return Err(RagError::ConfigError(format!(
                "confidence_threshold ({}) must be finite",
                self.config.confidence_threshold
            )));
        }
        if self.config.collection.trim().is_empty() {
            return Err(RagError::ConfigError("collection must not be empty".to_string()));
        }
        Ok(self.config)
    }
}
