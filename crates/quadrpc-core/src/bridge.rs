//! Carries a call over a framed byte stream.
//!
//! The bridge drives the local end that stands in for the remote peer:
//!
//! - On a server it holds the **caller** end. Incoming `Message`,
//!   `CloseSend` and `Cancel` frames act on the call as the remote caller
//!   would; the handler's responses are written out, followed by the
//!   terminal `Status` frame.
//! - On a client it holds the **responder** end. The application's
//!   requests are written out; incoming messages, `CloseSend` and the
//!   `Status` frame act on the call as the remote server would. If the call
//!   ends locally with an error (cancellation, deadline), a `Cancel` frame
//!   tells the server.
//!
//! A peer that closes the stream cleanly ends its direction (end of
//! stream). A transport failure, or a client-side stream that ends without
//! a `Status` frame, ends the call with `INTERNAL`.
//!
//! One connection carries exactly one call.

use quadrpc_common::transport::{FrameReader, FrameWriter};
use quadrpc_common::{CallError, Frame, Outcome, Status};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::call::CallHandle;
use crate::state::Role;

/// Pumps frames between `local` and the peer until the call ends.
///
/// Returns the terminal outcome.
pub async fn bridge<R, W>(local: CallHandle, reader: FrameReader<R>, writer: FrameWriter<W>) -> Outcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tokio::join!(
        pump_outbound(local.clone(), writer),
        pump_inbound(local.clone(), reader)
    );
    local.wait().await
}

/// Local messages to the wire.
async fn pump_outbound<W>(local: CallHandle, mut writer: FrameWriter<W>)
where
    W: AsyncWrite + Unpin,
{
    let ended = loop {
        match local.recv().await {
            Ok(Some(payload)) => {
                if let Err(e) = writer.write_frame(&Frame::message(payload)).await {
                    write_failed(&local, &e);
                    return;
                }
            }
            Ok(None) => break None,
            Err(e) => break Some(e),
        }
    };

    match local.role() {
        Role::Caller => {
            // Server side: report end of stream, then the outcome.
            if ended.is_none() {
                if let Err(e) = writer.write_frame(&Frame::CloseSend).await {
                    write_failed(&local, &e);
                    return;
                }
            }
            let outcome = local.wait().await;
            if let Err(e) = writer.write_frame(&Frame::from_outcome(&outcome)).await {
                tracing::debug!(call_id = local.id(), error = %e, "could not deliver status");
            }
            let _ = writer.shutdown().await;
        }
        Role::Responder => {
            // Client side: requests are done. A local failure is passed on
            // as a cancel; the server may already be gone.
            if ended.is_none() {
                if let Err(e) = writer.write_frame(&Frame::CloseSend).await {
                    write_failed(&local, &e);
                    return;
                }
            }
            if local.wait().await.is_err() {
                let _ = writer.write_frame(&Frame::Cancel).await;
            }
        }
    }
}

/// Wire frames to the local call.
async fn pump_inbound<R>(local: CallHandle, mut reader: FrameReader<R>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = tokio::select! {
            frame = reader.read_frame() => frame,
            _ = local.terminated() => return,
        };

        let frame = match frame {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                local.close_send();
                if local.role() == Role::Responder {
                    local.finish(Err(Status::internal("connection closed before call status")));
                }
                return;
            }
            Err(e) => {
                transport_failed(&local, "read", &e);
                return;
            }
        };

        match (local.role(), frame) {
            (_, Frame::Message { payload }) => {
                if let Err(e) = local.send(payload).await {
                    if e == CallError::SendClosed {
                        protocol_violation(&local, "message after end of stream");
                    }
                    return;
                }
            }
            (_, Frame::CloseSend) => local.close_send(),
            (Role::Caller, Frame::Cancel) => {
                tracing::debug!(call_id = local.id(), "peer cancelled call");
                local.cancel();
                return;
            }
            (Role::Responder, frame @ Frame::Status { .. }) => {
                if let Some(outcome) = frame.into_outcome() {
                    local.finish(outcome);
                }
                return;
            }
            (_, other) => {
                protocol_violation(&local, &format!("unexpected {} frame", other.kind()));
                return;
            }
        }
    }
}

/// On a server a failed write means the caller is gone. On a client the
/// status frame may still be readable, so the inbound side decides.
fn write_failed(local: &CallHandle, err: &dyn std::fmt::Display) {
    match local.role() {
        Role::Caller => transport_failed(local, "write", err),
        Role::Responder => {
            tracing::debug!(call_id = local.id(), error = %err, "transport write failed");
        }
    }
}

fn transport_failed(local: &CallHandle, op: &str, err: &dyn std::fmt::Display) {
    tracing::debug!(call_id = local.id(), error = %err, "transport {} failed", op);
    local.finish(Err(Status::internal(format!("transport {} failed: {}", op, err))));
}

fn protocol_violation(local: &CallHandle, detail: &str) {
    tracing::warn!(call_id = local.id(), detail, "protocol violation");
    local.finish(Err(Status::internal(format!("protocol violation: {}", detail))));
}
