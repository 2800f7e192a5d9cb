use thiserror::Error;

use super::status::{Code, Status};

/// Error returned by operations on a call.
///
/// All three variants mean the operation was refused because something is
/// closed. End of stream is not an error: `recv` reports it as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// This side already half-closed its sending direction, or the pattern
    /// does not let this side send more messages.
    #[error("send side of the call is closed")]
    SendClosed,

    /// The call reached a successful terminal outcome.
    #[error("call already completed")]
    Completed,

    /// The call reached an error terminal outcome (including cancellation
    /// and deadline expiry).
    #[error("{0}")]
    Failed(Status),
}

impl CallError {
    /// Kind of the terminal status, when the call failed.
    pub fn code(&self) -> Option<Code> {
        self.status().map(Status::code)
    }

    pub fn status(&self) -> Option<&Status> {
        match self {
            CallError::Failed(status) => Some(status),
            _ => None,
        }
    }

    /// Converts into a status suitable for ending a call.
    pub fn into_status(self) -> Status {
        match self {
            CallError::Failed(status) => status,
            other => Status::internal(other.to_string()),
        }
    }
}

impl From<Status> for CallError {
    fn from(status: Status) -> Self {
        CallError::Failed(status)
    }
}

/// Transport and codec level errors.
#[derive(Error, Debug)]
pub enum QuadrpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Frame too large: {size} bytes (max {max} bytes)")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Call error: {0}")]
    Call(#[from] CallError),
}

impl QuadrpcError {
    /// Status a call should end with when this error interrupts it.
    ///
    /// Call errors keep their own status; everything else is `Internal`.
    pub fn to_status(&self) -> Status {
        match self {
            QuadrpcError::Call(CallError::Failed(status)) => status.clone(),
            QuadrpcError::InvalidRequest(msg) => Status::invalid_argument(msg.clone()),
            other => Status::internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuadrpcError>;
