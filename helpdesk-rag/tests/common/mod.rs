//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use helpdesk_rag::{
    Catalogue, CatalogueEntry, CatalogueIndex, CatalogueIndexer, ContentFilter, EmbeddingProvider,
    EvaluationLedger, InMemoryVectorStore, RagConfig, RagError, RetrievalEngine,
};

/// Embeds only the texts it was told about; anything else is an embedding failure.
#[derive(Default)]
pub struct ScriptedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    pub batch_calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: [f32; 2]) -> Self {
        self.vectors.insert(text.to_string(), vector.to_vec());
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> helpdesk_rag::Result<Vec<f32>> {
        self.vectors.get(text).cloned().ok_or_else(|| RagError::EmbeddingError {
            provider: "Scripted".into(),
            message: format!("no vector for '{text}'"),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> helpdesk_rag::Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        2
    }
}

pub fn entry(id: &str, issue: &str, solution: &str) -> CatalogueEntry {
    CatalogueEntry::new(id, issue, solution)
}

pub async fn build_index(
    embedder: Arc<dyn EmbeddingProvider>,
    entries: Vec<CatalogueEntry>,
    batch_size: usize,
) -> CatalogueIndex {
    CatalogueIndexer::new(embedder, Arc::new(InMemoryVectorStore::new()))
        .with_batch_size(batch_size)
        .index_catalogue(Catalogue::new(entries).unwrap())
        .await
        .unwrap()
}

pub fn engine(index: CatalogueIndex, ledger: Arc<EvaluationLedger>) -> RetrievalEngine {
    RetrievalEngine::new(RagConfig::default(), ContentFilter::default(), Arc::new(index), ledger)
}
