use serde::{Deserialize, Serialize};

/// Body of a `POST /suggest-followups` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestResponse {
    /// Candidate next user messages, in display order.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// A non-streamed `/chat` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// The full assistant answer.
    #[serde(alias = "response")]
    pub answer: String,
}

/// The `{"detail": ...}` body a failing backend sends along with its status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_default_to_empty() {
        let resp: SuggestResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.suggestions.is_empty());
    }

    #[test]
    fn answer_accepts_response_alias() {
        let a: AnswerResponse = serde_json::from_str(r#"{"answer":"x"}"#).unwrap();
        let b: AnswerResponse = serde_json::from_str(r#"{"response":"x"}"#).unwrap();
        assert_eq!(a, b);
    }
}
