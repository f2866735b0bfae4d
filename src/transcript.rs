//! The ordered log of turns in a session.
//!
//! Turns are only ever appended.  The one exception to immutability is the
//! in-flight assistant turn, which is always the last turn and grows while its
//! answer streams in.  The log is emptied only as a whole.

use crate::types::{Role, Turn};

/// Ordered sequence of turns; insertion order is conversation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if there are no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns all turns in conversation order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Iterates the turns in conversation order.
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Returns the most recent turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Returns the assistant turn currently being streamed, if any.
    pub fn in_flight(&self) -> Option<&Turn> {
        self.turns.last().filter(|turn| !turn.is_complete())
    }

    /// Returns the text of the most recent user turn.
    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role() == Role::User)
            .map(Turn::content)
    }

    pub(crate) fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    pub(crate) fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
    }

    /// Opens an empty in-flight assistant turn.  Any turn still in flight is
    /// frozen first so there is never more than one.
    pub(crate) fn open_assistant(&mut self) {
        self.finish_in_flight();
        self.turns.push(Turn::in_flight());
    }

    /// Appends text to the in-flight turn.  Returns false if nothing is in
    /// flight.
    pub(crate) fn extend_in_flight(&mut self, text: &str) -> bool {
        match self.turns.last_mut() {
            Some(turn) => turn.append(text),
            None => false,
        }
    }

    /// Freezes the in-flight turn, keeping whatever content it has.  Returns
    /// false if nothing was in flight.
    pub(crate) fn finish_in_flight(&mut self) -> bool {
        match self.turns.last_mut() {
            Some(turn) if !turn.is_complete() => {
                turn.freeze();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streamed_turn_grows_in_place() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hello");
        transcript.open_assistant();
        assert!(transcript.in_flight().is_some());
        assert!(transcript.extend_in_flight("Hi"));
        assert!(transcript.extend_in_flight(" there"));
        assert_eq!(transcript.last().unwrap().content(), "Hi there");
        assert!(transcript.finish_in_flight());
        assert!(transcript.in_flight().is_none());
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn extend_without_in_flight_turn_is_rejected() {
        let mut transcript = Transcript::new();
        assert!(!transcript.extend_in_flight("orphan"));
        transcript.push_user("Hello");
        assert!(!transcript.extend_in_flight("more"));
        assert_eq!(transcript.last().unwrap().content(), "Hello");
        assert!(!transcript.finish_in_flight());
    }

    #[test]
    fn opening_a_turn_freezes_the_previous_one() {
        let mut transcript = Transcript::new();
        transcript.open_assistant();
        transcript.extend_in_flight("partial");
        transcript.open_assistant();
        assert!(transcript.turns()[0].is_complete());
        assert_eq!(transcript.turns()[0].content(), "partial");
        assert!(!transcript.turns()[1].is_complete());
    }

    #[test]
    fn last_user_text_skips_assistant_turns() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.last_user_text(), None);
        transcript.push_user("question");
        transcript.push_assistant("answer");
        assert_eq!(transcript.last_user_text(), Some("question"));
        transcript.clear();
        assert!(transcript.is_empty());
    }
}
