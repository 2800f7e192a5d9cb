use std::net::SocketAddr;
use std::sync::Arc;

use quadrpc_common::{QuadrpcError, Result};
use tokio::net::TcpListener;

use crate::server::Server;

/// Async TCP front end for a [`Server`].
///
/// Every accepted connection carries one call and is served on its own
/// task, so slow calls never hold up the accept loop.
pub struct TcpServer {
    listener: TcpListener,
}

impl TcpServer {
    /// Binds to `bind_addr` (e.g. "0.0.0.0:50051"; port 0 picks a free port).
    pub async fn bind(bind_addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| QuadrpcError::Connection(format!("Failed to bind to {}: {}", bind_addr, e)))?;

        Ok(Self { listener })
    }

    /// Gets the actual bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| QuadrpcError::Connection(format!("Failed to get local addr: {}", e)))
    }

    /// Accepts connections until accepting fails.
    pub async fn run(&self, server: Arc<Server>) -> Result<()> {
        loop {
            let (stream, peer_addr) = self
                .listener
                .accept()
                .await
                .map_err(|e| QuadrpcError::Connection(format!("Failed to accept connection: {}", e)))?;

            tracing::debug!(%peer_addr, "connection established");
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(%peer_addr, error = %e, "could not disable nagle");
            }

            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(e) = server.serve_connection(stream).await {
                    tracing::warn!(%peer_addr, error = %e, "connection error");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;
    use quadrpc_common::transport::framed;
    use quadrpc_common::{CallError, Frame, Outcome, Pattern};
    use quadrpc_core::CallHandle;
    use serde_json::json;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_tcp_server_local_addr() {
        let server = TcpServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_failure_is_connection_error() {
        let first = TcpServer::bind("127.0.0.1:0").await.unwrap();
        let addr = first.local_addr().unwrap().to_string();
        let second = TcpServer::bind(&addr).await;
        assert!(matches!(second, Err(QuadrpcError::Connection(_))));
    }

    #[tokio::test]
    async fn test_serves_call_over_tcp() {
        async fn double(call: CallHandle) -> Outcome {
            let n = call.recv().await.map_err(CallError::into_status)?;
            Ok(json!(n.and_then(|v| v.as_i64()).unwrap_or(0) * 2))
        }

        let tcp = TcpServer::bind("127.0.0.1:0").await.unwrap();
        let addr = tcp.local_addr().unwrap();
        let server = Arc::new(Server::new(Router::new().route("double", Pattern::Unary, double)));
        tokio::spawn(async move { tcp.run(server).await });

        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut reader, mut writer) = framed(stream);
        writer.write_frame(&Frame::open("double", Pattern::Unary, None)).await.unwrap();
        writer.write_frame(&Frame::message(json!(21))).await.unwrap();

        let mut outcome = None;
        while let Some(frame) = reader.read_frame().await.unwrap() {
            if let Some(o) = frame.into_outcome() {
                outcome = Some(o);
                break;
            }
        }
        assert_eq!(outcome, Some(Ok(json!(42))));
    }
}
