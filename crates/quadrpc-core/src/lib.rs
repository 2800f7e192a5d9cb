//! QuadRPC Call Core
//!
//! This crate implements the lifecycle of a single call in any of the four
//! interaction patterns:
//!
//! - **Unary**: one request, one response
//! - **Server streaming**: one request, many responses
//! - **Client streaming**: many requests, one response
//! - **Bidirectional streaming**: many requests and responses, independently
//!
//! # Components
//!
//! - [`channel`] - bounded, ordered, closable message channel
//! - [`state`] - call state machine and roles
//! - [`envelope`] - set-once terminal outcome
//! - [`call`] - [`begin_call`] and the [`CallHandle`] operations
//! - [`deadline`] - deadline timer and external cancellation
//! - [`driver`] - pumps between application streams and a call
//! - [`bridge`] - carries a call over a framed byte stream
//!
//! # Guarantees
//!
//! - Messages in each direction arrive in send order, at most once.
//! - A call ends exactly once; the first terminal outcome wins.
//! - After an error outcome every pending and later operation on the call
//!   reports that same status.
//! - A successful outcome lets buffered messages drain before end of stream.

pub mod bridge;
pub mod call;
pub mod channel;
pub mod deadline;
pub mod driver;
pub mod envelope;
pub mod state;

pub use bridge::bridge;
pub use call::{begin_call, begin_call_with_id, CallHandle};
pub use channel::MessageChannel;
pub use deadline::{deadline_after, Termination};
pub use driver::{drive_receive, drive_send, spawn_receive_driver, spawn_send_driver};
pub use envelope::StatusEnvelope;
pub use state::{CallState, Role};
