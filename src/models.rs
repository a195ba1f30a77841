//! Core data models for the intent chatbot

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Intent =================
//

/// A named category of user purpose with example utterances and replies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intent {
    pub tag: String,
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} patterns, {} responses)",
            self.tag,
            self.patterns.len(),
            self.responses.len()
        )
    }
}

/// One (pattern, tag) pair fed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingExample<'a> {
    pub pattern: &'a str,
    pub tag: &'a str,
}

//
// ================= Chat Log =================
//

/// One row of the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatLogEntry {
    pub user_input: String,
    pub bot_response: String,
    pub timestamp: String,
}

impl ChatLogEntry {
    /// Entry stamped with the current local time
    pub fn now(user_input: impl Into<String>, bot_response: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            bot_response: bot_response.into(),
            timestamp: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
        }
    }
}

//
// ================= Chat Reply =================
//

/// Outcome of a single chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    /// Predicted tag; `None` when the fallback answer was used
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_warning: Option<String>,
}
