use std::time::Duration;

use futures_util::stream::{self, Stream};
use quadrpc_common::transport::framed;
use quadrpc_common::{CallError, CallId, ChannelConfig, Frame, Outcome, Pattern, Payload, Status};
use quadrpc_core::{begin_call, bridge, deadline_after, CallHandle, CallState};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Per-call settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Time the call may take in total. Sent to the server as well, which
    /// enforces it on its side.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// QuadRPC client for making calls.
///
/// Opens a fresh TCP connection per call, so calls never queue behind
/// each other.
#[derive(Debug, Clone)]
pub struct QuadrpcClient {
    addr: String,
    channel: ChannelConfig,
}

impl QuadrpcClient {
    /// Creates a client for the server at `addr`. Nothing is connected
    /// until the first call.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            channel: ChannelConfig::default(),
        }
    }

    pub fn with_channel_config(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Opens a call of any pattern.
    pub async fn call(
        &self,
        method: &str,
        pattern: Pattern,
        options: CallOptions,
    ) -> Result<ClientCall, Status> {
        let stream = self.connect().await?;
        self.call_over(stream, method, pattern, options).await
    }

    /// Opens a call over an already established byte stream instead of a
    /// fresh TCP connection.
    pub async fn call_over<S>(
        &self,
        stream: S,
        method: &str,
        pattern: Pattern,
        options: CallOptions,
    ) -> Result<ClientCall, Status>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        ClientCall::open(stream, method, pattern, options, &self.channel).await
    }

    /// One request, one response.
    pub async fn unary(&self, method: &str, request: Payload, options: CallOptions) -> Outcome {
        let call = self.call(method, Pattern::Unary, options).await?;
        call.unary(request).await
    }

    /// Sends `request` and returns the call for reading the response stream.
    pub async fn server_streaming(
        &self,
        method: &str,
        request: Payload,
        options: CallOptions,
    ) -> Result<ClientCall, Status> {
        let call = self.call(method, Pattern::ServerStream, options).await?;
        call.send_single(request).await?;
        Ok(call)
    }

    /// Returns the call for streaming requests; `close_send` then `wait`
    /// yields the response.
    pub async fn client_streaming(&self, method: &str, options: CallOptions) -> Result<ClientCall, Status> {
        self.call(method, Pattern::ClientStream, options).await
    }

    pub async fn bidi_streaming(&self, method: &str, options: CallOptions) -> Result<ClientCall, Status> {
        self.call(method, Pattern::BidiStream, options).await
    }

    async fn connect(&self) -> Result<TcpStream, Status> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| Status::internal(format!("Failed to connect to {}: {}", self.addr, e)))?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(addr = %self.addr, error = %e, "could not disable nagle");
        }
        Ok(stream)
    }
}

/// The caller end of a call running over a connection.
///
/// Dropping a call that has not ended cancels it, which tells the server.
pub struct ClientCall {
    call: CallHandle,
    bridge: JoinHandle<Outcome>,
}

impl ClientCall {
    /// Opens a call over an established byte stream.
    ///
    /// Writes the `Open` frame and starts bridging the call to `stream`.
    pub async fn open<S>(
        stream: S,
        method: &str,
        pattern: Pattern,
        options: CallOptions,
        channel: &ChannelConfig,
    ) -> Result<Self, Status>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let deadline = options.timeout.map(deadline_after);
        let (call, proxy) = begin_call(pattern, deadline, channel);

        let (reader, mut writer) = framed(stream);
        let open = Frame::Open {
            call_id: call.id(),
            method: method.to_string(),
            pattern,
            timeout_ms: options
                .timeout
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        };
        if let Err(e) = writer.write_frame(&open).await {
            call.cancel();
            return Err(Status::internal(format!("Failed to open call: {}", e)));
        }
        tracing::debug!(call_id = call.id(), method, %pattern, "call opened");

        let bridge = tokio::spawn(bridge(proxy, reader, writer));
        Ok(Self { call, bridge })
    }

    pub fn id(&self) -> CallId {
        self.call.id()
    }

    pub fn pattern(&self) -> Pattern {
        self.call.pattern()
    }

    pub fn state(&self) -> CallState {
        self.call.state()
    }

    /// The underlying call, e.g. for the stream drivers.
    pub fn handle(&self) -> &CallHandle {
        &self.call
    }

    pub async fn send(&self, payload: Payload) -> Result<(), CallError> {
        self.call.send(payload).await
    }

    pub async fn recv(&self) -> Result<Option<Payload>, CallError> {
        self.call.recv().await
    }

    pub fn close_send(&self) {
        self.call.close_send()
    }

    pub fn cancel(&self) -> bool {
        self.call.cancel()
    }

    pub async fn wait(&self) -> Outcome {
        self.call.wait().await
    }

    /// Sends the single request of a unary call and waits for its response.
    pub async fn unary(self, request: Payload) -> Outcome {
        self.send_single(request).await?;
        self.wait().await
    }

    /// Waits for the outcome and for the connection to wind down.
    pub async fn finish(mut self) -> Outcome {
        let outcome = self.call.wait().await;
        if let Err(e) = (&mut self.bridge).await {
            tracing::debug!(call_id = self.id(), error = %e, "bridge task failed");
        }
        outcome
    }

    /// Incoming messages as a stream, ending after end of stream or the
    /// first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Payload, CallError>> + Send + 'static {
        stream::unfold(Some(self), |call| async move {
            let call = call?;
            match call.recv().await {
                Ok(Some(payload)) => Some((Ok(payload), Some(call))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// A request refused because the call already failed reports that
    /// failure; a call that already completed leaves `wait` to report it.
    async fn send_single(&self, request: Payload) -> Result<(), Status> {
        match self.call.send(request).await {
            Err(CallError::Failed(status)) => Err(status),
            _ => Ok(()),
        }
    }
}

impl Drop for ClientCall {
    fn drop(&mut self) {
        if !self.call.is_terminal() {
            tracing::debug!(call_id = self.call.id(), "call dropped before it ended");
            self.call.cancel();
        }
    }
}
