//! Feedback actions and their reconciliation into the evaluation ledger.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{RagError, Result};
use crate::feedback_log::{FeedbackLog, FeedbackLogEntry};
use crate::ledger::{EvaluationLedger, EvaluationRecord, Feedback, QueryToken};
use crate::metrics::RetrievalMetrics;

/// Separates the fields of an encoded [`FeedbackAction`]. Catalogue ids may not contain it.
pub const ACTION_SEPARATOR: char = '|';

/// A selectable feedback button attached to an answer.
///
/// The compact string form (`helpful|7|<token>`) fits in chat callback
/// payloads; the token part is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackAction {
    pub feedback: Feedback,
    pub candidate_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<QueryToken>,
}

impl FeedbackAction {
    pub fn new(feedback: Feedback, candidate_id: impl Into<String>) -> Self {
        Self { feedback, candidate_id: candidate_id.into(), token: None }
    }

    pub fn with_token(mut self, token: QueryToken) -> Self {
        self.token = Some(token);
        self
    }

    /// The `Helpful` / `NotHelpful` pair offered for one answered query.
    pub fn pair_for(candidate_id: &str, token: QueryToken) -> [FeedbackAction; 2] {
        [
            FeedbackAction::new(Feedback::Helpful, candidate_id).with_token(token),
            FeedbackAction::new(Feedback::NotHelpful, candidate_id).with_token(token),
        ]
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ACTION_SEPARATOR}{}", self.feedback, self.candidate_id)?;
        if let Some(token) = self.token {
            write!(f, "{ACTION_SEPARATOR}{token}")?;
        }
        Ok(())
    }
}

impl FromStr for FeedbackAction {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.splitn(3, ACTION_SEPARATOR);
        let feedback: Feedback = fields.next().unwrap_or_default().parse()?;
        let candidate_id = match fields.next() {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(RagError::InvalidFeedbackAction(format!(
                    "missing candidate id in '{s}'"
                )));
            }
        };
        let token = fields.next().map(str::parse::<QueryToken>).transpose()?;
        Ok(Self { feedback, candidate_id: candidate_id.to_string(), token })
    }
}

/// What happened to a feedback event in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reconciliation {
    /// The targeted record was updated.
    Applied { record: EvaluationRecord },
    /// The ledger was empty.
    NothingToUpdate,
    /// The event did not match the ledger and was dropped.
    Ignored { reason: String },
}

/// Result of [`FeedbackReconciler::on_feedback`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackOutcome {
    pub reconciliation: Reconciliation,
    /// Aggregate metrics after the update.
    pub metrics: RetrievalMetrics,
    /// Whether the event reached the durable feedback log.
    pub logged: bool,
}

/// Folds user feedback into the ledger and the audit log. Holds no state of its own.
pub struct FeedbackReconciler {
    ledger: Arc<EvaluationLedger>,
    log: Option<Arc<FeedbackLog>>,
}

impl FeedbackReconciler {
    pub fn new(ledger: Arc<EvaluationLedger>) -> Self {
        Self { ledger, log: None }
    }

    /// Also append every event to `log`.
    pub fn with_log(mut self, log: Arc<FeedbackLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Apply one feedback event.
    ///
    /// Actions carrying a token update that query's record; tokenless actions
    /// update the most recent record. Mismatched, repeated and unknown-token
    /// feedback is logged and ignored. A failing audit log is reported through
    /// [`FeedbackOutcome::logged`] rather than an error.
    ///
    /// # Errors
    ///
    /// Only errors that are not best-effort feedback problems are returned.
    pub async fn on_feedback(
        &self,
        user_id: &str,
        action: &FeedbackAction,
    ) -> Result<FeedbackOutcome> {
        let logged = self.append_log(user_id, action).await;

        let applied = match action.token {
            Some(token) => self
                .ledger
                .apply_feedback_for(token, action.feedback, &action.candidate_id)
                .await
                .map(Some),
            None => self.ledger.apply_feedback(action.feedback, &action.candidate_id).await,
        };

        let reconciliation = match applied {
            Ok(Some(record)) => {
                info!(
                    user_id,
                    candidate_id = %action.candidate_id,
                    feedback = %action.feedback,
                    token = %record.token,
                    "feedback applied"
                );
                Reconciliation::Applied { record }
            }
            Ok(None) => {
                info!(user_id, candidate_id = %action.candidate_id, "feedback with empty ledger");
                Reconciliation::NothingToUpdate
            }
            Err(e) if e.is_ignorable_feedback() => {
                warn!(user_id, candidate_id = %action.candidate_id, error = %e, "feedback ignored");
                Reconciliation::Ignored { reason: e.to_string() }
            }
            Err(e) => return Err(e),
        };

        let metrics = self.ledger.aggregate().await;
        info!(
            total_queries = metrics.total_queries,
            evaluated_queries = metrics.evaluated_queries,
            precision_at_1 = metrics.precision_at_1,
            precision_at_3 = metrics.precision_at_3,
            precision_at_5 = metrics.precision_at_5,
            mrr = metrics.mrr,
            "evaluation metrics"
        );

        Ok(FeedbackOutcome { reconciliation, metrics, logged })
    }

    async fn append_log(&self, user_id: &str, action: &FeedbackAction) -> bool {
        let Some(log) = &self.log else {
            return false;
        };
        let entry = FeedbackLogEntry::new(user_id, &action.candidate_id, action.feedback);
        match log.append(&entry).await {
            Ok(()) => true,
            Err(e) => {
                error!(path = %log.path().display(), error = %e, "failed to append feedback log");
                false
            }
        }
    }
}
