use serde::{Deserialize, Serialize};

use crate::types::{Role, Turn};

/// Body of a `POST /chat` request.
///
/// The backend keeps no conversation state, so the normal form carries the
/// whole transcript on every call.  Some deployments only accept the latest
/// question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatRequest {
    /// The full ordered history, including the newest user turn.
    History {
        /// Every turn of the conversation so far.
        history: Vec<Turn>,
    },

    /// A single question with no history.
    Question {
        /// The latest user text.
        question: String,
    },
}

impl ChatRequest {
    /// Create a request carrying the full history.
    pub fn history(turns: &[Turn]) -> Self {
        Self::History {
            history: turns.to_vec(),
        }
    }

    /// Create a legacy request from the most recent user turn, if there is one.
    pub fn question(turns: &[Turn]) -> Option<Self> {
        turns
            .iter()
            .rev()
            .find(|turn| turn.role() == Role::User)
            .map(|turn| Self::Question {
                question: turn.content().to_string(),
            })
    }
}

/// Body of a `POST /suggest-followups` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestRequest {
    /// The finalized conversation.
    pub history: Vec<Turn>,
}
