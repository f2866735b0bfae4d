use std::fmt;

use serde::{Deserialize, Serialize};

/// Speaker of a turn.
///
/// Older backends tagged assistant replies as `system`; that tag is accepted on
/// input and folded into [`Role::Assistant`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User role.
    User,

    /// Assistant role.
    #[serde(alias = "system")]
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in the conversation.
///
/// User turns are complete from the moment they are created.  An assistant
/// turn opened by [`Turn::in_flight`] grows through [`Turn::append`] until it is
/// frozen; after that its content never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    #[serde(skip, default = "frozen")]
    complete: bool,
}

fn frozen() -> bool {
    true
}

impl Turn {
    /// Create a complete user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            complete: true,
        }
    }

    /// Create a complete assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            complete: true,
        }
    }

    /// Create an empty assistant turn that accepts streamed content.
    pub fn in_flight() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            complete: false,
        }
    }

    /// The speaker of this turn.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The text of this turn.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// True once the turn can no longer grow.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True if the turn has no content yet.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Append streamed text.  Returns false, leaving the turn untouched, if the
    /// turn is already complete.
    pub(crate) fn append(&mut self, text: &str) -> bool {
        if self.complete {
            return false;
        }
        self.content.push_str(text);
        true
    }

    /// Mark the turn complete.
    pub(crate) fn freeze(&mut self) {
        self.complete = true;
    }
}
