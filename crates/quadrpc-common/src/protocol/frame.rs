//! QuadRPC Wire Frames
//!
//! A connection carries exactly one call. The caller opens it with an
//! [`Frame::Open`], both sides exchange [`Frame::Message`]s and half-close
//! with [`Frame::CloseSend`], and the server ends the call with a single
//! [`Frame::Status`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use super::pattern::Pattern;
use super::status::{Code, Outcome, Status};

pub type CallId = u64;
pub type MethodName = String;
/// Application payload; opaque to the call machinery.
pub type Payload = serde_json::Value;

static CALL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Status wire value meaning "completed successfully".
const STATUS_OK: u32 = 0;

/// One unit on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// First frame of a connection, caller to server.
    Open {
        call_id: CallId,
        method: MethodName,
        pattern: Pattern,
        timeout_ms: Option<u64>,
    },
    /// One application message in the sender's direction.
    Message { payload: Payload },
    /// The sender will not send further messages.
    CloseSend,
    /// The caller abandons the call.
    Cancel,
    /// Terminal outcome, server to caller. `code` 0 means success.
    Status {
        code: u32,
        message: String,
        value: Option<Payload>,
    },
}

impl Frame {
    pub fn open(method: impl Into<String>, pattern: Pattern, timeout_ms: Option<u64>) -> Self {
        Frame::Open {
            call_id: generate_call_id(),
            method: method.into(),
            pattern,
            timeout_ms,
        }
    }

    pub fn message(payload: Payload) -> Self {
        Frame::Message { payload }
    }

    pub fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Ok(value) => Frame::Status {
                code: STATUS_OK,
                message: String::new(),
                value: Some(value.clone()),
            },
            Err(status) => Frame::Status {
                code: status.code().as_u32(),
                message: status.message().to_string(),
                value: None,
            },
        }
    }

    /// Returns the outcome carried by a `Status` frame.
    pub fn into_outcome(self) -> Option<Outcome> {
        match self {
            Frame::Status { code: STATUS_OK, value, .. } => {
                Some(Ok(value.unwrap_or(Payload::Null)))
            }
            Frame::Status { code, message, .. } => {
                Some(Err(Status::new(Code::from_u32(code), message)))
            }
            _ => None,
        }
    }

    /// Short frame name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Open { .. } => "open",
            Frame::Message { .. } => "message",
            Frame::CloseSend => "close_send",
            Frame::Cancel => "cancel",
            Frame::Status { .. } => "status",
        }
    }
}

/// Generates a process-unique call id.
///
/// The upper 32 bits come from the wall clock and the lower 32 bits from a
/// counter, so ids stay unique under concurrent generation.
pub fn generate_call_id() -> CallId {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let counter = CALL_ID_COUNTER.fetch_add(1, Ordering::SeqCst);

    (timestamp & 0xFFFF_FFFF_0000_0000) | (counter & 0xFFFF_FFFF)
}
