//! QuadRPC
//!
//! Umbrella crate re-exporting the QuadRPC workspace:
//!
//! - [`common`] - status codes, frames, codec and configuration
//! - [`call`] - calls, message channels, drivers and deadlines
//! - [`server`] - handler router, connection serving and demo services
//! - [`client`] - connection-per-call client for the four call patterns

pub use quadrpc_client as client;
pub use quadrpc_common as common;
pub use quadrpc_core as call;
pub use quadrpc_server as server;
