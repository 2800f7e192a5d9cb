//! Serving calls over byte streams.

use std::sync::Arc;
use std::time::{Duration, Instant};

use quadrpc_common::transport::framed;
use quadrpc_common::{Frame, Outcome, Pattern, QuadrpcError, Result, Status};
use quadrpc_core::{begin_call_with_id, bridge, deadline_after, CallHandle};
use quadrpc_metrics::{MetricsCollector, ServerMetricsCollector};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ServerConfig;
use crate::router::Router;

/// Dispatches incoming calls to the routes of a [`Router`].
///
/// A server is transport agnostic: [`Server::serve_connection`] takes any
/// byte stream carrying one call. [`crate::TcpServer`] feeds it TCP
/// connections; tests feed it `tokio::io::duplex` pipes.
pub struct Server {
    router: Router,
    config: ServerConfig,
    metrics: Arc<dyn MetricsCollector>,
}

impl Server {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            config: ServerConfig::default(),
            metrics: Arc::new(ServerMetricsCollector::new()),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics
    }

    /// Serves the single call carried by `stream`.
    ///
    /// Reads the `Open` frame, starts the call and runs its handler, then
    /// pumps frames until the call reaches a terminal state. Returns the
    /// call's outcome.
    ///
    /// # Errors
    ///
    /// Fails only if the stream does not start with a valid `Open` frame.
    /// Anything that goes wrong once the call exists is reported to the
    /// caller as a status instead.
    pub async fn serve_connection<S>(&self, stream: S) -> Result<Outcome>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut reader, writer) = framed(stream);

        let (call_id, method, pattern, timeout_ms) = match reader.read_frame().await? {
            Some(Frame::Open {
                call_id,
                method,
                pattern,
                timeout_ms,
            }) => (call_id, method, pattern, timeout_ms),
            Some(other) => {
                return Err(QuadrpcError::Protocol(format!(
                    "expected open frame, got {}",
                    other.kind()
                )))
            }
            None => {
                return Err(QuadrpcError::Connection(
                    "connection closed before open frame".to_string(),
                ))
            }
        };

        let timeout = self
            .config
            .effective_timeout(timeout_ms.map(Duration::from_millis));
        let deadline = timeout.map(deadline_after);
        let (caller, responder) = begin_call_with_id(call_id, pattern, deadline, &self.config.channel);

        let start_time = Instant::now();
        self.metrics.call_started();
        self.dispatch(&method, responder);

        let outcome = bridge(caller, reader, writer).await;

        let result = outcome.as_ref().map(|_| ()).map_err(Status::code);
        self.metrics.record_call(&method, start_time, result);
        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => tracing::info!(call_id, %method, %pattern, elapsed_ms, "call completed"),
            Err(status) => tracing::info!(
                call_id,
                %method,
                %pattern,
                elapsed_ms,
                code = %status.code(),
                message = status.message(),
                "call failed"
            ),
        }

        Ok(outcome)
    }

    /// Starts the handler for `method` on its own task.
    ///
    /// Calls that cannot be routed are finished right away; the bridge then
    /// reports the status.
    fn dispatch(&self, method: &str, responder: CallHandle) {
        if self.metrics.is_metrics_request(method) {
            let outcome = if responder.pattern() == Pattern::Unary {
                match self.metrics.handle_metrics_request(method, &self.router.methods()) {
                    Some(Ok(payload)) => Ok(payload),
                    Some(Err(e)) => Err(e.to_status()),
                    None => Err(Status::unimplemented(format!("unknown method '{}'", method))),
                }
            } else {
                Err(Status::invalid_argument(format!(
                    "'{}' is unary, not {}",
                    method,
                    responder.pattern()
                )))
            };
            responder.finish(outcome);
            return;
        }

        let route = match self.router.get(method) {
            Some(route) => route,
            None => {
                tracing::debug!(call_id = responder.id(), %method, "no route");
                responder.finish(Err(Status::unimplemented(format!("unknown method '{}'", method))));
                return;
            }
        };

        if route.pattern() != responder.pattern() {
            responder.finish(Err(Status::invalid_argument(format!(
                "'{}' is {}, not {}",
                method,
                route.pattern(),
                responder.pattern()
            ))));
            return;
        }

        let handler = route.handler();
        let call = responder.clone();
        tokio::spawn(async move {
            // The inner task isolates handler panics.
            let outcome = match tokio::spawn(handler.call(call)).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(call_id = responder.id(), error = %e, "handler panicked");
                    Err(Status::internal("handler failed"))
                }
            };
            responder.finish(outcome);
        });
    }
}
