//! Vector store trait for storing catalogue embeddings and finding neighbours.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A catalogue entry's embedding, keyed by the entry id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedEntry {
    /// The id of the [`CatalogueEntry`](crate::catalogue::CatalogueEntry) this vector came from.
    pub id: String,
    /// The embedding of the entry's issue text.
    pub vector: Vec<f32>,
}

/// A stored entry id paired with its distance to the query vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Neighbor {
    pub id: String,
    /// Non-negative distance; smaller is more similar.
    pub distance: f32,
}

/// A storage backend for catalogue embeddings with nearest-neighbour search.
///
/// This is the black-box "find k nearest vectors" capability.
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("it_support", 512).await?;
/// store.upsert("it_support", &entries).await?;
/// let nearest = store.search("it_support", &query_vector, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace entries in a collection.
    async fn upsert(&self, collection: &str, entries: &[EmbeddedEntry]) -> Result<()>;

    /// Number of entries stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Find the `top_k` entries nearest to `vector`.
    ///
    /// Returns at most `top_k` neighbours ordered by ascending distance. The
    /// order must be deterministic for an unchanged collection.
    async fn search(&self, collection: &str, vector: &[f32], top_k: usize)
    -> Result<Vec<Neighbor>>;
}
