//! QuadRPC Common Types and Transport
//!
//! This crate provides the protocol definitions, wire framing and configuration
//! shared by every QuadRPC component.
//!
//! # Overview
//!
//! QuadRPC is a small RPC interaction layer built around four call patterns:
//! unary, server streaming, client streaming and bidirectional streaming.
//! This crate contains the pieces that both ends of a connection agree on:
//!
//! - **Protocol Layer**: status codes, call errors, call patterns and frames
//! - **Transport Layer**: JSON frame codec and length-prefixed async framing
//! - **Configuration**: message channel sizing
//!
//! # Architecture
//!
//! The wire protocol is deliberately simple:
//! - **Transport**: any ordered byte stream (TCP, `tokio::io::duplex`)
//! - **Serialization**: JSON
//! - **Frame Format**: `[4-byte length prefix as u32 big-endian] + [JSON frame]`
//! - **Max Frame Size**: 16 MiB
//! - **Calls per connection**: exactly one
//!
//! # Components
//!
//! - [`protocol`] - Status, CallError, Pattern and Frame types
//! - [`transport`] - codec and framed reader/writer
//! - [`config`] - channel configuration
//!
//! # Example
//!
//! ```
//! use quadrpc_common::{Code, Frame, Pattern, Status};
//! use serde_json::json;
//!
//! let open = Frame::open("calculator.sum", Pattern::Unary, None);
//! let reply = Frame::from_outcome(&Ok(json!({"sum": 50})));
//! let failure = Status::invalid_argument("received a negative number: -25");
//! assert_eq!(failure.code(), Code::InvalidArgument);
//! # let _ = (open, reply);
//! ```

pub mod config;
pub mod protocol;
pub mod transport;

pub use config::ChannelConfig;
pub use protocol::*;
