//! Stream drivers.
//!
//! A send driver pumps an application stream into a call; a receive driver
//! pumps a call into an application callback. Each runs until its side of
//! the data is exhausted or the call ends, and never outlives the call.

use futures_util::{Stream, StreamExt};
use quadrpc_common::{CallError, Payload, Status};
use tokio::task::JoinHandle;

use crate::call::CallHandle;

/// Sends every item of `source` on `call`, then half-closes.
///
/// Returns the number of messages sent. An `Err` item from the source ends
/// the call with that status. Stops early, without consuming further
/// items, once the call can no longer accept messages.
pub async fn drive_send<S>(call: &CallHandle, source: S) -> Result<u64, CallError>
where
    S: Stream<Item = Result<Payload, Status>>,
{
    let mut source = std::pin::pin!(source);
    let mut sent = 0u64;

    loop {
        let item = tokio::select! {
            item = source.next() => item,
            _ = call.terminated() => {
                return Err(ended(call));
            }
        };

        match item {
            Some(Ok(payload)) => {
                call.send(payload).await?;
                sent += 1;
            }
            Some(Err(status)) => {
                tracing::debug!(call_id = call.id(), %status, "send source failed");
                call.finish(Err(status.clone()));
                return Err(CallError::Failed(status));
            }
            None => break,
        }
    }

    call.close_send();
    Ok(sent)
}

/// Delivers every incoming message of `call` to `sink` until end of stream.
///
/// Returns the number of messages delivered. An `Err` from the sink ends
/// the call with that status.
pub async fn drive_receive<F>(call: &CallHandle, mut sink: F) -> Result<u64, CallError>
where
    F: FnMut(Payload) -> Result<(), Status>,
{
    let mut received = 0u64;

    while let Some(payload) = call.recv().await? {
        if let Err(status) = sink(payload) {
            tracing::debug!(call_id = call.id(), %status, "receive sink failed");
            call.finish(Err(status.clone()));
            return Err(CallError::Failed(status));
        }
        received += 1;
    }

    Ok(received)
}

/// Runs [`drive_send`] as its own task.
pub fn spawn_send_driver<S>(call: CallHandle, source: S) -> JoinHandle<Result<u64, CallError>>
where
    S: Stream<Item = Result<Payload, Status>> + Send + 'static,
{
    tokio::spawn(async move { drive_send(&call, source).await })
}

/// Runs [`drive_receive`] as its own task.
pub fn spawn_receive_driver<F>(call: CallHandle, sink: F) -> JoinHandle<Result<u64, CallError>>
where
    F: FnMut(Payload) -> Result<(), Status> + Send + 'static,
{
    tokio::spawn(async move { drive_receive(&call, sink).await })
}

fn ended(call: &CallHandle) -> CallError {
    match call.outcome() {
        Some(Err(status)) => CallError::Failed(status),
        _ => CallError::Completed,
    }
}
