//! QuadRPC Status Codes
//!
//! Every call ends in exactly one terminal outcome: a successful value or a
//! [`Status`] carrying a [`Code`] and a human readable message. Callers branch
//! on the code; the message is diagnostic text only.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::frame::Payload;

/// Terminal outcome of a call.
pub type Outcome = std::result::Result<Payload, Status>;

/// Error kind carried by a terminal [`Status`].
///
/// Numeric values follow the gRPC status code table so a code survives
/// the wire unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum Code {
    /// The call was cancelled explicitly.
    Cancelled = 1,
    /// A code the receiver does not understand.
    Unknown = 2,
    /// Malformed or out-of-domain input.
    InvalidArgument = 3,
    /// The call deadline expired before a terminal outcome was reached.
    DeadlineExceeded = 4,
    /// A referenced resource does not exist.
    NotFound = 5,
    /// The method is not served here.
    Unimplemented = 12,
    /// Unexpected failure in a collaborator or the transport.
    Internal = 13,
}

impl Code {
    /// Maps a wire value back to a code. Unrecognised values become `Unknown`.
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Code::Cancelled,
            3 => Code::InvalidArgument,
            4 => Code::DeadlineExceeded,
            5 => Code::NotFound,
            12 => Code::Unimplemented,
            13 => Code::Internal,
            _ => Code::Unknown,
        }
    }

    /// Numeric wire value of this code.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured error outcome: kind plus diagnostic message.
///
/// # Example
///
/// ```
/// use quadrpc_common::{Code, Status};
///
/// let status = Status::not_found("no blog with id 00000000000000ff");
/// assert_eq!(status.code(), Code::NotFound);
/// assert_eq!(status.to_string(), "NOT_FOUND: no blog with id 00000000000000ff");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Status {}
