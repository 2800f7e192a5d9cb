use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shape of a call: how many messages flow in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// One request, one terminal response.
    Unary,
    /// One request, N streamed responses.
    ServerStream,
    /// N streamed requests, one terminal response.
    ClientStream,
    /// N requests and M responses, independent of each other.
    BidiStream,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [
        Pattern::Unary,
        Pattern::ServerStream,
        Pattern::ClientStream,
        Pattern::BidiStream,
    ];

    /// Whether the caller may send more than one message.
    pub fn caller_streams(self) -> bool {
        matches!(self, Pattern::ClientStream | Pattern::BidiStream)
    }

    /// Whether the responder sends messages at all (as opposed to answering
    /// only through the terminal value).
    pub fn responder_streams(self) -> bool {
        matches!(self, Pattern::ServerStream | Pattern::BidiStream)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Pattern::Unary => "unary",
            Pattern::ServerStream => "server_stream",
            Pattern::ClientStream => "client_stream",
            Pattern::BidiStream => "bidi_stream",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown call pattern '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_shapes() {
        assert!(!Pattern::Unary.caller_streams());
        assert!(!Pattern::Unary.responder_streams());
        assert!(Pattern::ServerStream.responder_streams());
        assert!(!Pattern::ServerStream.caller_streams());
        assert!(Pattern::ClientStream.caller_streams());
        assert!(!Pattern::ClientStream.responder_streams());
        assert!(Pattern::BidiStream.caller_streams());
        assert!(Pattern::BidiStream.responder_streams());
    }

    #[test]
    fn test_parse_pattern() {
        for pattern in Pattern::ALL {
            assert_eq!(pattern.as_str().parse::<Pattern>().unwrap(), pattern);
        }
        assert!("duplex".parse::<Pattern>().is_err());
    }
}
