//! Chat-facing facade: turns engine outcomes into replies a transport can send.
//!
//! Transports call [`HelpdeskAssistant::on_user_text`] for every message and
//! [`HelpdeskAssistant::on_feedback_action`] when a feedback button is pressed.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{Answer, Rejection, RetrievalEngine};
use crate::error::{RagError, Result};
use crate::feedback::{FeedbackAction, FeedbackOutcome, FeedbackReconciler};
use crate::ledger::{Feedback, QueryToken};
use crate::metrics::RetrievalMetrics;

const LOW_RELEVANCE_MESSAGE: &str = "Sorry, your question does not look related to IT support.\n\n\
I can help with IT problems such as:\n\
• Laptop/computer issues\n\
• Printers not working\n\
• Internet/wifi connection\n\
• Passwords and accounts\n\
• Software/applications\n\n\
Please ask about your IT problem.";

const NO_MATCH_MESSAGE: &str = "Sorry, I could not find a suitable solution for your problem.\n\n\
Try:\n\
• Describing the problem more specifically\n\
• Using different keywords\n\
• Contacting IT Support directly if it is urgent";

const HELPFUL_THANKS: &str = "Thank you! Glad I could help!";
const NOT_HELPFUL_THANKS: &str = "Thanks for the feedback! I will try to do better.";

const START_MESSAGE: &str = "*Welcome to the SFL IT Support assistant!*\n\n\
Type your IT question directly, for example:\n\
• Laptop cannot connect to wifi\n\
• How to reset my email password\n\
• Printer cannot print\n\n\
Please keep the conversation polite and professional.\n\
Describe your problem specifically for the best results.\n\n\
Send /help for more.";

const HELP_MESSAGE: &str = "*IT Support assistant help*\n\n\
/start - Start the assistant\n\
/help - Show this help\n\
/about - About this assistant\n\
/stats - Retrieval quality metrics\n\n\
Just type your IT question without any command. The assistant finds the \
most relevant solution in the IT Support catalogue.";

/// Bot commands understood by the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Help,
    About,
    Stats,
}

impl FromStr for Command {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('/').to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "about" => Ok(Command::About),
            "stats" => Ok(Command::Stats),
            other => Err(RagError::UnknownCommand(other.to_string())),
        }
    }
}

/// A labelled feedback button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyAction {
    pub label: String,
    pub action: FeedbackAction,
}

/// Structured answer: the matched issue, its solution, and two feedback buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionCard {
    pub candidate_id: String,
    pub issue: String,
    pub solution: String,
    pub confidence: f32,
    pub token: QueryToken,
    pub actions: Vec<ReplyAction>,
}

impl SolutionCard {
    /// Markdown body as sent to chat clients.
    pub fn render(&self) -> String {
        format!(
            "*Solution for your problem:*\n\n*Issue:*\n{}\n\n*Solution:*\n{}\n\n\
             Confidence: {:.1}%\n\n---\nDid this solve your problem? If not, try \
             describing it in more detail.",
            self.issue, self.solution, self.confidence
        )
    }
}

/// What the transport should send back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Text { text: String },
    Solution(SolutionCard),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into() }
    }
}

/// Composes the retrieval engine and the feedback reconciler.
pub struct HelpdeskAssistant {
    engine: Arc<RetrievalEngine>,
    reconciler: Arc<FeedbackReconciler>,
}

impl HelpdeskAssistant {
    pub fn new(engine: Arc<RetrievalEngine>, reconciler: Arc<FeedbackReconciler>) -> Self {
        Self { engine, reconciler }
    }

    pub fn engine(&self) -> &Arc<RetrievalEngine> {
        &self.engine
    }

    /// Answer one user message.
    ///
    /// # Errors
    ///
    /// Propagates embedding and vector store failures from the engine.
    pub async fn on_user_text(&self, user_id: &str, text: &str) -> Result<Reply> {
        info!(user_id, text_len = text.len(), "user message");
        let reply = match self.engine.answer(text).await? {
            Answer::Answered { candidate, confidence, token } => {
                let actions = FeedbackAction::pair_for(&candidate.id, token)
                    .into_iter()
                    .map(|action| ReplyAction {
                        label: button_label(action.feedback).into(),
                        action,
                    })
                    .collect();
                Reply::Solution(SolutionCard {
                    candidate_id: candidate.id,
                    issue: candidate.issue,
                    solution: candidate.solution,
                    confidence,
                    token,
                    actions,
                })
            }
            Answer::Rejected(Rejection::Guardrail { reason }) => Reply::text(reason),
            Answer::Rejected(Rejection::LowRelevance { .. }) => Reply::text(LOW_RELEVANCE_MESSAGE),
            Answer::NoMatch => Reply::text(NO_MATCH_MESSAGE),
        };
        Ok(reply)
    }

    /// Record a pressed feedback button and thank the user.
    pub async fn on_feedback_action(
        &self,
        user_id: &str,
        action: &FeedbackAction,
    ) -> Result<(Reply, FeedbackOutcome)> {
        let outcome = self.reconciler.on_feedback(user_id, action).await?;
        let thanks = match action.feedback {
            Feedback::Helpful => HELPFUL_THANKS,
            Feedback::NotHelpful => NOT_HELPFUL_THANKS,
        };
        Ok((Reply::text(thanks), outcome))
    }

    /// Current aggregate retrieval metrics.
    pub async fn stats(&self) -> RetrievalMetrics {
        self.engine.ledger().aggregate().await
    }

    /// Reply to a bot command.
    pub async fn on_command(&self, command: Command) -> Reply {
        match command {
            Command::Start => Reply::text(START_MESSAGE),
            Command::Help => Reply::text(HELP_MESSAGE),
            Command::About => Reply::text(self.about_message()),
            Command::Stats => Reply::text(format!(
                "*Retrieval quality*\n\n```\n{}\n```",
                self.stats().await
            )),
        }
    }

    fn about_message(&self) -> String {
        format!(
            "*About the SFL IT Support assistant*\n\n\
             • Semantic retrieval over {} known issues\n\
             • Guardrail filter on incoming questions\n\
             • Online Precision@k and MRR from your feedback",
            self.engine.index().catalogue().len()
        )
    }
}

fn button_label(feedback: Feedback) -> &'static str {
    match feedback {
        Feedback::Helpful => "✅ Helpful",
        Feedback::NotHelpful => "❌ Not helpful",
    }
}
