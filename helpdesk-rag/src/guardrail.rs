//! Pre-retrieval content filter.

use serde::{Deserialize, Serialize};

/// Terms blocked by [`ContentFilter::default`], in Indonesian and English.
pub const DEFAULT_BLOCKED_TERMS: &[&str] = &[
    "anjing", "babi", "bangsat", "kampret", "tolol", "bodoh", "goblok", "asu", "fuck", "shit",
    "bitch", "idiot", "stupid", "bajingan", "sialan",
];

const DEFAULT_REJECTION: &str = "Please keep the conversation polite. Your question contains \
                                 language that is not allowed.";

/// Outcome of a guardrail check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GuardrailResult {
    Pass,
    Fail {
        /// Human-readable rejection message.
        reason: String,
    },
}

impl GuardrailResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, GuardrailResult::Pass)
    }

    pub fn is_fail(&self) -> bool {
        !self.is_pass()
    }

    /// The rejection reason, or `""` when the text passed.
    pub fn reason(&self) -> &str {
        match self {
            GuardrailResult::Pass => "",
            GuardrailResult::Fail { reason } => reason,
        }
    }
}

/// Case-insensitive substring denylist.
///
/// Runs before any embedding work. Stateless: checking has no side effects.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    blocked: Vec<String>,
    rejection: String,
}

impl ContentFilter {
    /// Create a filter over the given terms with the default rejection message.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocked = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { blocked, rejection: DEFAULT_REJECTION.to_string() }
    }

    /// Replace the message returned on rejection.
    pub fn with_rejection_message(mut self, message: impl Into<String>) -> Self {
        self.rejection = message.into();
        self
    }

    /// Check `text` against the denylist, stopping at the first match.
    pub fn check(&self, text: &str) -> GuardrailResult {
        let lowered = text.to_lowercase();
        if self.blocked.iter().any(|term| lowered.contains(term.as_str())) {
            GuardrailResult::Fail { reason: self.rejection.clone() }
        } else {
            GuardrailResult::Pass
        }
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_TERMS)
    }
}
