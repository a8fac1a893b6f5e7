//! # helpdesk-rag
//!
//! Semantic question answering over a fixed IT-support catalogue, with online
//! retrieval-quality evaluation driven by user feedback.
//!
//! ## Overview
//!
//! - [`Catalogue`] holds the known issue/solution pairs.
//! - [`CatalogueIndexer`] embeds the catalogue once through an
//!   [`EmbeddingProvider`] and a [`VectorStore`], producing a searchable
//!   [`CatalogueIndex`].
//! - [`RetrievalEngine`] runs the [`ContentFilter`] guardrail, ranks
//!   candidates, turns distance into confidence and records answered queries
//!   in the [`EvaluationLedger`].
//! - [`FeedbackReconciler`] folds "helpful"/"not helpful" judgments back into
//!   the ledger, which reports Precision@1/3/5 and MRR.
//! - [`HelpdeskAssistant`] packages all of it behind a receive-text /
//!   send-reply interface for chat transports.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helpdesk_rag::*;
//!
//! let config = RagConfig::default();
//! let index = CatalogueIndexer::new(
//!     Arc::new(HashingEmbeddingProvider::default()),
//!     Arc::new(InMemoryVectorStore::with_metric(config.distance_metric)),
//! )
//! .with_batch_size(config.batch_size)
//! .index_catalogue(Catalogue::load("catalogue.json")?)
//! .await?;
//!
//! let ledger = Arc::new(EvaluationLedger::new());
//! let engine = RetrievalEngine::new(config, ContentFilter::default(), Arc::new(index), ledger);
//! let answer = engine.answer("my wifi won't connect").await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Enables                     |
//! |----------|-----------------------------|
//! | `openai` | `OpenAIEmbeddingProvider`   |

pub mod assistant;
pub mod catalogue;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod feedback_log;
pub mod guardrail;
pub mod index;
pub mod inmemory;
pub mod ledger;
pub mod metrics;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

pub use assistant::{Command, HelpdeskAssistant, Reply, ReplyAction, SolutionCard};
pub use catalogue::{Catalogue, CatalogueEntry};
pub use config::{RagConfig, RagConfigBuilder};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use engine::{Answer, Rejection, RetrievalEngine, confidence_from_distance};
pub use error::{RagError, Result};
pub use feedback::{FeedbackAction, FeedbackOutcome, FeedbackReconciler, Reconciliation};
pub use feedback_log::{FeedbackLog, FeedbackLogEntry};
pub use guardrail::{ContentFilter, DEFAULT_BLOCKED_TERMS, GuardrailResult};
pub use index::{CatalogueIndex, CatalogueIndexer, RetrievedCandidate};
pub use inmemory::{DistanceMetric, InMemoryVectorStore};
pub use ledger::{EvaluationLedger, EvaluationRecord, Feedback, FeedbackStatus, QueryToken};
pub use metrics::{RetrievalMetrics, precision_at, reciprocal_rank};
pub use vectorstore::{EmbeddedEntry, Neighbor, VectorStore};

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
