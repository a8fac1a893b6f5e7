//! Vector index adapter: embeds the catalogue once, then answers searches.
//!
//! Indexing consumes a [`CatalogueIndexer`] and produces a
//! [`CatalogueIndex`], so search is only reachable after every batch has been
//! embedded and stored.
//!
//! # Example
//!
//! ```rust,ignore
//! use helpdesk_rag::{CatalogueIndexer, HashingEmbeddingProvider, InMemoryVectorStore};
//!
//! let index = CatalogueIndexer::new(
//!     Arc::new(HashingEmbeddingProvider::default()),
//!     Arc::new(InMemoryVectorStore::new()),
//! )
//! .index_catalogue(catalogue)
//! .await?;
//! let candidates = index.search("printer offline", 5).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::catalogue::Catalogue;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::{EmbeddedEntry, VectorStore};

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_COLLECTION: &str = "it_support";

/// A catalogue entry retrieved for a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedCandidate {
    pub id: String,
    pub issue: String,
    pub solution: String,
    /// Distance between the query and the entry's issue; smaller is closer.
    pub distance: f32,
    /// 1-based position in the result list.
    pub rank: usize,
}

/// Builder-side of the adapter. Consumed by [`index_catalogue`](Self::index_catalogue).
pub struct CatalogueIndexer {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
}

impl CatalogueIndexer {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embedding_provider,
            vector_store,
            collection: DEFAULT_COLLECTION.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the vector store collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the number of entries embedded and upserted per batch. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed every entry's issue text and store it keyed by id.
    ///
    /// Batches are processed in catalogue order; batch size does not affect
    /// the final index contents.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if any entry cannot be embedded,
    /// or [`RagError::VectorStoreError`] if storing fails.
    pub async fn index_catalogue(self, catalogue: Catalogue) -> Result<CatalogueIndex> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(&self.collection, dimensions).await?;

        let total = catalogue.len();
        for (batch_no, batch) in catalogue.entries().chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|e| e.issue.as_str()).collect();
            let vectors = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(batch = batch_no, error = %e, "embedding failed during indexing");
                e
            })?;
            if vectors.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: "index".into(),
                    message: format!(
                        "provider returned {} vectors for {} entries",
                        vectors.len(),
                        batch.len()
                    ),
                });
            }

            let embedded: Vec<EmbeddedEntry> = batch
                .iter()
                .zip(vectors)
                .map(|(entry, vector)| EmbeddedEntry { id: entry.id.clone(), vector })
                .collect();
            self.vector_store.upsert(&self.collection, &embedded).await.map_err(|e| {
                error!(batch = batch_no, error = %e, "upsert failed during indexing");
                e
            })?;
            debug!(batch = batch_no, entries = embedded.len(), "indexed batch");
        }

        info!(collection = %self.collection, entries = total, dimensions, "catalogue indexed");

        Ok(CatalogueIndex {
            embedding_provider: self.embedding_provider,
            vector_store: self.vector_store,
            collection: self.collection,
            catalogue,
        })
    }
}

/// A fully indexed catalogue, ready for search.
pub struct CatalogueIndex {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    catalogue: Catalogue,
}

impl CatalogueIndex {
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Rank catalogue entries against `query`, nearest first.
    ///
    /// Returns at most `k` candidates. An empty index or an empty search
    /// result yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `k` is zero,
    /// [`RagError::EmbeddingError`] if the query cannot be embedded, and
    /// [`RagError::VectorStoreError`] if the search backend fails.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedCandidate>> {
        if k == 0 {
            return Err(RagError::ConfigError("k must be greater than zero".to_string()));
        }
        if self.catalogue.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during search");
            e
        })?;

        let neighbors = self.vector_store.search(&self.collection, &vector, k).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "vector store search failed");
            e
        })?;

        let candidates: Vec<RetrievedCandidate> = neighbors
            .into_iter()
            .filter_map(|neighbor| {
                let entry = self.catalogue.get(&neighbor.id)?;
                Some((entry, neighbor.distance))
            })
            .enumerate()
            .map(|(position, (entry, distance))| RetrievedCandidate {
                id: entry.id.clone(),
                issue: entry.issue.clone(),
                solution: entry.solution.clone(),
                distance,
                rank: position + 1,
            })
            .collect();

        debug!(k, result_count = candidates.len(), "search completed");
        Ok(candidates)
    }
}
