//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::scroll::DEFAULT_FOLLOW_THRESHOLD;

/// Default ceiling on a single user message, in characters.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 256;

/// Default number of follow-up suggestions shown.
const DEFAULT_MAX_SUGGESTIONS: usize = 4;

/// Default connect timeout for the backend.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Command-line arguments for the palaver-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat backend.
    #[arrrg(optional, "Backend base URL (default: $PALAVER_BACKEND_URL or http://localhost:8000/)", "URL")]
    pub backend: Option<String>,

    /// Maximum characters per message.
    #[arrrg(optional, "Max characters per message (default: 256)", "CHARS")]
    pub max_input: Option<u32>,

    /// Starter prompts shown on an empty conversation, separated by `|`.
    #[arrrg(optional, "Starter prompts separated by '|'", "PROMPTS")]
    pub prompts: Option<String>,

    /// Send only the latest question instead of the full history.
    #[arrrg(flag, "Use the legacy single-question request body")]
    pub legacy: bool,

    /// Do not request follow-up suggestions.
    #[arrrg(flag, "Disable follow-up suggestions")]
    pub no_suggestions: bool,

    /// Skip the liveness check on startup.
    #[arrrg(flag, "Skip the startup liveness check")]
    pub no_ping: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Backend base URL.  `None` defers to the environment, then localhost.
    pub backend_url: Option<String>,

    /// Connect timeout for backend requests.
    pub connect_timeout: Duration,

    /// Character ceiling enforced by the input surface.
    pub max_input_chars: usize,

    /// Whether to fetch follow-up suggestions after each answer.
    pub suggestions_enabled: bool,

    /// Maximum number of suggestions kept.
    pub max_suggestions: usize,

    /// Whether to send `{question}` instead of `{history}`.
    pub legacy_question: bool,

    /// Whether to ping the backend when the session becomes ready.
    pub ping_on_ready: bool,

    /// Pixel distance from the bottom that still counts as following.
    pub scroll_threshold: f32,

    /// Starter prompts offered on an empty conversation.
    pub default_prompts: Vec<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Max input: 256 characters
    /// - Suggestions: enabled, at most 4
    /// - Request body: full history
    /// - Scroll threshold: 50 px
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            backend_url: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            suggestions_enabled: true,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            legacy_question: false,
            ping_on_ready: true,
            scroll_threshold: DEFAULT_FOLLOW_THRESHOLD,
            default_prompts: Vec::new(),
            use_color: true,
        }
    }

    /// Sets the backend base URL.
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the input character ceiling.
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Enables or disables follow-up suggestions.
    pub fn with_suggestions(mut self, enabled: bool) -> Self {
        self.suggestions_enabled = enabled;
        self
    }

    /// Sets the maximum number of suggestions kept.
    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.max_suggestions = max_suggestions;
        self
    }

    /// Switches to the legacy single-question request body.
    pub fn with_legacy_question(mut self, legacy: bool) -> Self {
        self.legacy_question = legacy;
        self
    }

    /// Enables or disables the liveness check.
    pub fn with_ping_on_ready(mut self, ping: bool) -> Self {
        self.ping_on_ready = ping;
        self
    }

    /// Sets the autoscroll threshold.
    pub fn with_scroll_threshold(mut self, threshold: f32) -> Self {
        self.scroll_threshold = threshold;
        self
    }

    /// Sets the starter prompts.
    pub fn with_default_prompts(mut self, prompts: Vec<String>) -> Self {
        self.default_prompts = prompts;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let default_prompts = args
            .prompts
            .map(|prompts| {
                prompts
                    .split('|')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        ChatConfig {
            backend_url: args.backend,
            max_input_chars: args
                .max_input
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_MAX_INPUT_CHARS),
            suggestions_enabled: !args.no_suggestions,
            legacy_question: args.legacy,
            ping_on_ready: !args.no_ping,
            default_prompts,
            use_color: !args.no_color,
            ..ChatConfig::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.backend_url.is_none());
        assert_eq!(config.max_input_chars, 256);
        assert!(config.suggestions_enabled);
        assert_eq!(config.max_suggestions, 4);
        assert!(!config.legacy_question);
        assert!(config.ping_on_ready);
        assert_eq!(config.scroll_threshold, 50.0);
        assert!(config.default_prompts.is_empty());
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            backend: Some("http://chat.internal:9000".to_string()),
            max_input: Some(128),
            prompts: Some("Current project? | | What's new?".to_string()),
            legacy: true,
            no_suggestions: true,
            no_ping: true,
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(
            config.backend_url.as_deref(),
            Some("http://chat.internal:9000")
        );
        assert_eq!(config.max_input_chars, 128);
        assert_eq!(
            config.default_prompts,
            vec!["Current project?".to_string(), "What's new?".to_string()]
        );
        assert!(config.legacy_question);
        assert!(!config.suggestions_enabled);
        assert!(!config.ping_on_ready);
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_backend_url("http://localhost:1234")
            .with_connect_timeout(Duration::from_secs(2))
            .with_max_input_chars(64)
            .with_suggestions(false)
            .with_max_suggestions(2)
            .with_legacy_question(true)
            .with_ping_on_ready(false)
            .with_scroll_threshold(24.0)
            .with_default_prompts(vec!["Hi".to_string()])
            .without_color();

        assert_eq!(config.backend_url.as_deref(), Some("http://localhost:1234"));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.max_input_chars, 64);
        assert!(!config.suggestions_enabled);
        assert_eq!(config.max_suggestions, 2);
        assert!(config.legacy_question);
        assert!(!config.ping_on_ready);
        assert_eq!(config.scroll_threshold, 24.0);
        assert_eq!(config.default_prompts, vec!["Hi".to_string()]);
        assert!(!config.use_color);
    }
}
