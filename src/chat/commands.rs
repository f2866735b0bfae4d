//! Slash command parsing for the chat application.
//!
//! Input that starts with `/` controls the session and is never sent to the
//! backend.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// Submit the follow-up suggestion (or, on an empty conversation, the
    /// starter prompt) with this zero-based index.
    Use(usize),

    /// List the current suggestions or starter prompts.
    Suggestions,

    /// Replay the conversation so far.
    History,

    /// Check the backend is alive.
    Ping,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be submitted as a regular message.
///
/// # Examples
///
/// ```
/// # use palaver::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/use 2"), Some(ChatCommand::Use(1)));
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "reset" => ChatCommand::Clear,
        "use" | "pick" => match argument {
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) if n > 0 => ChatCommand::Use(n - 1),
                _ => ChatCommand::Invalid("/use expects a number starting at 1".to_string()),
            },
            None => ChatCommand::Invalid("/use requires a suggestion number".to_string()),
        },
        "suggestions" | "s" => ChatCommand::Suggestions,
        "history" | "h" => ChatCommand::History,
        "ping" => ChatCommand::Ping,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history
  /use <n>               Send suggestion <n> (starter prompt <n> when empty)
  /suggestions           List suggestions or starter prompts
  /history               Replay the conversation
  /ping                  Check the backend is alive
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/RESET"), Some(ChatCommand::Clear));
    }

    #[test]
    fn parse_use() {
        assert_eq!(parse_command("/use 1"), Some(ChatCommand::Use(0)));
        assert_eq!(parse_command("/pick  3 "), Some(ChatCommand::Use(2)));
        assert!(matches!(
            parse_command("/use 0"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("starting at 1")
        ));
        assert!(matches!(
            parse_command("/use"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_misc() {
        assert_eq!(parse_command("/suggestions"), Some(ChatCommand::Suggestions));
        assert_eq!(parse_command("/ping"), Some(ChatCommand::Ping));
        assert_eq!(parse_command("/h"), Some(ChatCommand::History));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
        assert_eq!(
            parse_command("/bogus"),
            Some(ChatCommand::Invalid("Unknown command: /bogus".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/clear"));
        assert!(help.contains("/use"));
    }
}
