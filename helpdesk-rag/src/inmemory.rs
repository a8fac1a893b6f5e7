//! In-memory vector store with exhaustive nearest-neighbour search.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by insertion-ordered vectors protected by a `tokio::sync::RwLock`.
//! A few thousand catalogue entries search in well under a millisecond, which
//! covers the helpdesk use case without an ANN engine.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{RagError, Result};
use crate::vectorstore::{EmbeddedEntry, Neighbor, VectorStore};

const BACKEND: &str = "InMemory";

/// How the store measures distance between two vectors.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`, in `[0, 2]`.
    #[default]
    Cosine,
    /// Sum of squared component differences.
    SquaredL2,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => (1.0 - cosine_similarity(a, b)).max(0.0),
            DistanceMetric::SquaredL2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    entries: Vec<EmbeddedEntry>,
    positions: HashMap<String, usize>,
}

impl Collection {
    fn check_dimensions(&self, len: usize, what: &str) -> Result<()> {
        if len != self.dimensions {
            return Err(store_error(format!(
                "{what} has {len} dimensions, collection expects {}",
                self.dimensions
            )));
        }
        Ok(())
    }
}

/// An in-memory vector store.
///
/// Entries keep their insertion order, and search uses a stable sort, so
/// equal distances are always returned in insertion order.
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_rag::{DistanceMetric, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::with_metric(DistanceMetric::SquaredL2);
/// store.create_collection("it_support", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    metric: DistanceMetric,
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store using cosine distance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store with the given distance metric.
    pub fn with_metric(metric: DistanceMetric) -> Self {
        Self { metric, collections: RwLock::default() }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

fn store_error(message: String) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.to_string(), message }
}

fn missing_collection(collection: &str) -> RagError {
    store_error(format!("collection '{collection}' does not exist"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, ..Collection::default() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, entries: &[EmbeddedEntry]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for entry in entries {
            store.check_dimensions(entry.vector.len(), &format!("entry '{}'", entry.id))?;
        }
        for entry in entries {
            match store.positions.get(&entry.id) {
                Some(&position) => store.entries[position] = entry.clone(),
                None => {
                    store.positions.insert(entry.id.clone(), store.entries.len());
                    store.entries.push(entry.clone());
                }
            }
        }
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        Ok(store.entries.len())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<Neighbor>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        if store.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        store.check_dimensions(vector.len(), "query vector")?;

        let mut neighbors: Vec<Neighbor> = store
            .entries
            .iter()
            .map(|entry| Neighbor {
                id: entry.id.clone(),
                distance: self.metric.distance(&entry.vector, vector),
            })
            .collect();

        // sort_by is stable: ties keep insertion order
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(top_k);
        Ok(neighbors)
    }
}
