//! Append-only evaluation ledger.
//!
//! One [`EvaluationRecord`] per answered query, in arrival order. Relevance
//! starts as an optimistic `{top candidate}` placeholder and is rewritten
//! exactly once when feedback for that query arrives. All operations take
//! the same lock, so feedback can never land on a record that is being
//! appended concurrently.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::metrics::{MetricsAccumulator, RetrievalMetrics};

/// Correlation token issued for every recorded query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryToken(Uuid);

impl QueryToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QueryToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QueryToken {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| RagError::InvalidFeedbackAction(format!("invalid query token '{s}': {e}")))
    }
}

/// A user's binary judgment of the top-ranked answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
}

impl Feedback {
    pub fn as_str(self) -> &'static str {
        match self {
            Feedback::Helpful => "helpful",
            Feedback::NotHelpful => "not_helpful",
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feedback {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "helpful" => Ok(Feedback::Helpful),
            "not_helpful" => Ok(Feedback::NotHelpful),
            other => Err(RagError::InvalidFeedbackAction(format!("unknown feedback '{other}'"))),
        }
    }
}

/// Feedback state of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Helpful,
    NotHelpful,
}

impl From<Feedback> for FeedbackStatus {
    fn from(feedback: Feedback) -> Self {
        match feedback {
            Feedback::Helpful => FeedbackStatus::Helpful,
            Feedback::NotHelpful => FeedbackStatus::NotHelpful,
        }
    }
}

/// One answered query and its (provisional or reconciled) relevance labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub token: QueryToken,
    pub query: String,
    /// Ranked candidate ids; never changes after the record is appended.
    pub retrieved_ids: Vec<String>,
    pub relevant_ids: BTreeSet<String>,
    pub feedback: FeedbackStatus,
    pub recorded_at: DateTime<Utc>,
}

impl EvaluationRecord {
    /// The id the user was shown, if any.
    pub fn top_id(&self) -> Option<&str> {
        self.retrieved_ids.first().map(String::as_str)
    }

    fn resolve(&mut self, feedback: Feedback, candidate_id: &str) -> Result<()> {
        if self.feedback != FeedbackStatus::Pending {
            return Err(RagError::FeedbackAlreadyApplied);
        }
        let expected = self.top_id().unwrap_or_default();
        if expected != candidate_id {
            return Err(RagError::MalformedFeedback {
                expected: expected.to_string(),
                received: candidate_id.to_string(),
            });
        }

        self.feedback = feedback.into();
        self.relevant_ids = match feedback {
            Feedback::Helpful => BTreeSet::from([candidate_id.to_string()]),
            // the truly relevant entry is unknown
            Feedback::NotHelpful => BTreeSet::new(),
        };
        Ok(())
    }
}

/// Process-lifetime, append-only sequence of [`EvaluationRecord`]s.
///
/// Construct one at startup and share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct EvaluationLedger {
    records: RwLock<Vec<EvaluationRecord>>,
}

impl EvaluationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record with `Pending` feedback and return its token.
    pub async fn record(
        &self,
        query: impl Into<String>,
        retrieved_ids: Vec<String>,
        relevant_ids: BTreeSet<String>,
    ) -> QueryToken {
        let token = QueryToken::new();
        let record = EvaluationRecord {
            token,
            query: query.into(),
            retrieved_ids,
            relevant_ids,
            feedback: FeedbackStatus::Pending,
            recorded_at: Utc::now(),
        };
        self.records.write().await.push(record);
        token
    }

    /// Apply feedback to the last record.
    ///
    /// Returns the updated record, or `None` when the ledger is empty.
    ///
    /// # Errors
    ///
    /// - [`RagError::FeedbackAlreadyApplied`] if the last record is no longer pending
    /// - [`RagError::MalformedFeedback`] if `candidate_id` is not its top id
    pub async fn apply_feedback(
        &self,
        feedback: Feedback,
        candidate_id: &str,
    ) -> Result<Option<EvaluationRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records.last_mut() else {
            return Ok(None);
        };
        record.resolve(feedback, candidate_id)?;
        Ok(Some(record.clone()))
    }

    /// Apply feedback to the record issued `token`.
    ///
    /// # Errors
    ///
    /// [`RagError::UnknownQueryToken`] if no record carries `token`, plus the
    /// errors of [`apply_feedback`](Self::apply_feedback).
    pub async fn apply_feedback_for(
        &self,
        token: QueryToken,
        feedback: Feedback,
        candidate_id: &str,
    ) -> Result<EvaluationRecord> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .rev()
            .find(|r| r.token == token)
            .ok_or_else(|| RagError::UnknownQueryToken(token.to_string()))?;
        record.resolve(feedback, candidate_id)?;
        Ok(record.clone())
    }

    /// Average Precision@1/3/5 and MRR over records with non-empty
    /// retrieved and relevant ids. `total_queries` counts every record.
    pub async fn aggregate(&self) -> RetrievalMetrics {
        let records = self.records.read().await;
        let mut acc = MetricsAccumulator::default();
        for record in records.iter() {
            acc.add(&record.retrieved_ids, &record.relevant_ids);
        }
        acc.finish()
    }

    /// Snapshot of all records in arrival order.
    pub async fn records(&self) -> Vec<EvaluationRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_round_trips_through_str() {
        for feedback in [Feedback::Helpful, Feedback::NotHelpful] {
            assert_eq!(feedback.as_str().parse::<Feedback>().unwrap(), feedback);
        }
        assert!("maybe".parse::<Feedback>().is_err());
    }

    #[test]
    fn token_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<QueryToken>().is_err());
        let token = QueryToken::new();
        assert_eq!(token.to_string().parse::<QueryToken>().unwrap(), token);
    }
}
