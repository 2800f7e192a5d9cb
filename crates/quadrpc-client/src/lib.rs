//! QuadRPC Client
//!
//! [`QuadrpcClient`] opens one connection per call and returns a
//! [`ClientCall`] for the streaming patterns. A `ClientCall` behaves like the
//! caller end of an in-process call: `send`, `recv`, `close_send`, `cancel`
//! and `wait` work the same, with the server on the other side of the wire.
//!
//! ```no_run
//! use quadrpc_client::{CallOptions, QuadrpcClient};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = QuadrpcClient::new("127.0.0.1:50051");
//! let options = CallOptions::new().with_timeout(Duration::from_secs(5));
//! let sum = client.unary("calculator.sum", json!({"a": 10, "b": 40}), options).await;
//! println!("{:?}", sum);
//! # }
//! ```

pub mod client;

pub use client::{CallOptions, ClientCall, QuadrpcClient};
