//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based identifier for one accepted connection
//! - `DisplayName`: validated, trimmed chat name

use uuid::Uuid;

use crate::error::AppError;

/// Maximum display name length in characters
pub const MAX_NAME_CHARS: usize = 32;

/// Name used as the sender of system notices (reserved)
pub const SERVER_NAME: &str = "Server";

/// Unique connection identifier (newtype pattern)
///
/// Tags log lines for a connection before it has a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name of a connected client
///
/// Always trimmed and non-empty. Used as the registry key, so two
/// sessions can never share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayName(String);

impl DisplayName {
    /// Parse a candidate name as read from the wire
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let name = raw.trim();

        if name.is_empty() {
            return Err(AppError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(AppError::InvalidName(format!(
                "names are limited to {} characters",
                MAX_NAME_CHARS
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(AppError::InvalidName(
                "names cannot contain control characters".to_string(),
            ));
        }
        if name.eq_ignore_ascii_case(SERVER_NAME) {
            return Err(AppError::InvalidName(format!("'{}' is reserved", name)));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_name_is_trimmed() {
        let name = DisplayName::parse("  alice \r").unwrap();
        assert_eq!(name.as_str(), "alice");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(DisplayName::parse(""), Err(AppError::EmptyName)));
        assert!(matches!(DisplayName::parse("   \t"), Err(AppError::EmptyName)));
    }

    #[test]
    fn test_long_name_rejected() {
        let long = "x".repeat(MAX_NAME_CHARS + 1);
        assert!(matches!(
            DisplayName::parse(&long),
            Err(AppError::InvalidName(_))
        ));

        let exact = "é".repeat(MAX_NAME_CHARS);
        assert!(DisplayName::parse(&exact).is_ok());
    }

    #[test]
    fn test_control_characters_rejected() {
        assert!(matches!(
            DisplayName::parse("al\u{7}ice"),
            Err(AppError::InvalidName(_))
        ));
    }

    #[test]
    fn test_server_name_reserved() {
        assert!(matches!(
            DisplayName::parse("server"),
            Err(AppError::InvalidName(_))
        ));
    }
}
