//! Channel references and resolved peers

use std::fmt;

/// Operator-supplied channel reference.
///
/// The platform marks channel ids with a `-100` prefix; an integer carrying
/// that prefix is a numeric id. Anything else, including a bare integer
/// without the prefix, resolves as a username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    Username(String),
    Id(i64),
}

impl ChannelRef {
    pub fn parse(input: &str) -> ChannelRef {
        let trimmed = input.trim();
        if let Ok(id) = trimmed.parse::<i64>() {
            if trimmed.starts_with("-100") {
                return ChannelRef::Id(id);
            }
        }
        ChannelRef::Username(trimmed.to_string())
    }

    /// Form sent to the gateway resolve endpoint
    pub fn as_query(&self) -> String {
        match self {
            ChannelRef::Username(name) => name.clone(),
            ChannelRef::Id(id) => id.to_string(),
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Username(name) => write!(f, "{}", name),
            ChannelRef::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Resolved channel descriptor returned by the gateway.
///
/// `id` is the bare positive channel id (no `-100` marker).
#[derive(Debug, Clone)]
pub struct ChannelPeer {
    pub id: i64,
    pub username: Option<String>,
    pub title: String,
}

impl ChannelPeer {
    /// Permalink for one message: channel-relative when a public handle
    /// exists, numeric-id form otherwise.
    pub fn permalink(&self, message_id: i64) -> String {
        match &self.username {
            Some(username) => format!("https://t.me/{}/{}", username, message_id),
            None => format!("https://t.me/c/{}/{}", self.id, message_id),
        }
    }

    /// Batch file stem: the public handle, falling back to the numeric id
    pub fn file_stem(&self) -> String {
        match &self.username {
            Some(username) => username.clone(),
            None => self.id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_username() {
        assert_eq!(
            ChannelRef::parse("lobelia4cosmetics"),
            ChannelRef::Username("lobelia4cosmetics".to_string())
        );
    }

    #[test]
    fn parse_marked_numeric_id() {
        assert_eq!(
            ChannelRef::parse("-1001234567890"),
            ChannelRef::Id(-1001234567890)
        );
    }

    #[test]
    fn bare_integer_is_a_username() {
        // Only the -100-prefixed form is treated as a numeric id
        assert_eq!(
            ChannelRef::parse("1234567890"),
            ChannelRef::Username("1234567890".to_string())
        );
        assert_eq!(
            ChannelRef::parse("-200123"),
            ChannelRef::Username("-200123".to_string())
        );
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(
            ChannelRef::parse("  chemed123  "),
            ChannelRef::Username("chemed123".to_string())
        );
    }

    #[test]
    fn permalink_prefers_public_handle() {
        let peer = ChannelPeer {
            id: 1234567890,
            username: Some("chemed123".to_string()),
            title: "CheMed".to_string(),
        };
        assert_eq!(peer.permalink(42), "https://t.me/chemed123/42");
        assert_eq!(peer.file_stem(), "chemed123");
    }

    #[test]
    fn permalink_falls_back_to_numeric_form() {
        let peer = ChannelPeer {
            id: 1234567890,
            username: None,
            title: "Private".to_string(),
        };
        assert_eq!(peer.permalink(42), "https://t.me/c/1234567890/42");
        assert_eq!(peer.file_stem(), "1234567890");
    }
}
