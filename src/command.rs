//! Slash command parsing

/// A `/`-prefixed line typed by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/users` - private user list
    Users,
    /// `/help` - private help text
    Help,
    /// `/quit` - leave the chat
    Quit,
    /// Anything else starting with `/`
    Unknown(String),
}

impl Command {
    /// Parse a trimmed line. Returns `None` for lines that are not commands.
    ///
    /// Only the first whitespace-separated token is significant.
    pub fn parse(line: &str) -> Option<Self> {
        if !line.starts_with('/') {
            return None;
        }

        let token = line.split_whitespace().next().unwrap_or(line);
        let cmd = match token {
            "/users" => Command::Users,
            "/help" => Command::Help,
            "/quit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
        Some(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_commands() {
        assert_eq!(Command::parse("/users"), Some(Command::Users));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
    }

    #[test]
    fn test_trailing_arguments_ignored() {
        assert_eq!(Command::parse("/users please"), Some(Command::Users));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Command::parse("/dance now"),
            Some(Command::Unknown("/dance".to_string()))
        );
        assert_eq!(Command::parse("/"), Some(Command::Unknown("/".to_string())));
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(Command::parse("hello /users"), None);
        assert_eq!(Command::parse("USERS"), None);
    }

    #[test]
    fn test_commands_are_case_sensitive() {
        assert_eq!(
            Command::parse("/QUIT"),
            Some(Command::Unknown("/QUIT".to_string()))
        );
    }
}
