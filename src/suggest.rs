//! Best-effort follow-up suggestions.
//!
//! Suggestions are decoration: any failure is logged and reads as "no
//! suggestions".  Nothing here can fail an exchange or touch the transcript.

use crate::client::ChatBackend;
use crate::observability::{SUGGEST_FAILURES, SUGGEST_REQUESTS};
use crate::types::{SuggestRequest, Turn};

/// Ask the backend for follow-up prompts for a finalized conversation.
///
/// Returns at most `limit` cleaned suggestions, or none on any failure.
pub async fn fetch_suggestions<B>(backend: &B, history: Vec<Turn>, limit: usize) -> Vec<String>
where
    B: ChatBackend + ?Sized,
{
    SUGGEST_REQUESTS.click();
    match backend.suggest_followups(SuggestRequest { history }).await {
        Ok(raw) => clean_suggestions(raw, limit),
        Err(err) => {
            SUGGEST_FAILURES.click();
            tracing::debug!(error = %err, "follow-up suggestions unavailable");
            Vec::new()
        }
    }
}

/// Trim suggestions, drop empty ones and list markers, and cap the count.
pub fn clean_suggestions(raw: Vec<String>, limit: usize) -> Vec<String> {
    raw.iter()
        .map(|s| strip_list_marker(s).trim())
        .filter(|s| !s.is_empty())
        .take(limit)
        .map(String::from)
        .collect()
}

/// Strips a leading `-`, `*`, `•`, `1.` or `1)` marker.
fn strip_list_marker(s: &str) -> &str {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0
        && let Some(rest) = s[digits..].strip_prefix(['.', ')'])
    {
        return rest.trim_start();
    }
    s
}
