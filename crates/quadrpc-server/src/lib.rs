//! QuadRPC Server
//!
//! This crate routes incoming calls to handlers and serves them over byte
//! streams.
//!
//! # Overview
//!
//! - [`Router`] maps method names to a call pattern and a [`Handler`]
//! - [`Server`] reads the `Open` frame of a connection, starts the call,
//!   runs the handler on its own task and bridges the call to the wire
//! - [`TcpServer`] accepts TCP connections and hands each one to a
//!   [`Server`]
//! - [`services`] holds the demo calculator, greet and blog services
//!
//! Handlers receive the responder end of a call. Whatever they return ends
//! the call, unless they already ended it themselves.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use quadrpc_server::services::{demo_router, GreetService};
//! use quadrpc_server::{MemoryBlogStore, Server, TcpServer};
//!
//! # #[tokio::main]
//! # async fn main() -> quadrpc_common::Result<()> {
//! let router = demo_router(GreetService::new(), Arc::new(MemoryBlogStore::new()));
//! let server = Arc::new(Server::new(router));
//! let tcp = TcpServer::bind("127.0.0.1:50051").await?;
//! tcp.run(server).await
//! # }
//! ```

pub mod config;
pub mod router;
pub mod server;
pub mod services;
pub mod store;
pub mod tcp_server;

pub use config::ServerConfig;
pub use router::{Handler, HandlerFuture, Route, Router};
pub use server::Server;
pub use store::{Blog, BlogDraft, BlogId, BlogStore, MemoryBlogStore, StoreError};
pub use tcp_server::TcpServer;
