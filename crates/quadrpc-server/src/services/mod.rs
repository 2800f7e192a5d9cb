//! Demo services exercising each call pattern.
//!
//! | method                          | pattern        |
//! |---------------------------------|----------------|
//! | `calculator.sum`                | unary          |
//! | `calculator.prime_decomposition`| server stream  |
//! | `calculator.compute_average`    | client stream  |
//! | `calculator.square_root`        | unary          |
//! | `greet.greet`                   | unary          |
//! | `greet.greet_many_times`        | server stream  |
//! | `greet.long_greet`              | client stream  |
//! | `greet.greet_everyone`          | bidi stream    |
//! | `greet.greet_with_deadline`     | unary          |
//! | `blog.create_blog`              | unary          |
//! | `blog.read_blog`                | unary          |
//! | `blog.update_blog`              | unary          |
//! | `blog.delete_blog`              | unary          |
//! | `blog.list_blog`                | server stream  |

use std::sync::Arc;

use quadrpc_common::{CallError, Payload, Status};
use quadrpc_core::CallHandle;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::router::Router;
use crate::store::BlogStore;

pub mod blog;
pub mod calculator;
pub mod greet;

pub use blog::BlogService;
pub use calculator::CalculatorService;
pub use greet::GreetService;

/// Router serving all three demo services.
pub fn demo_router(greet: GreetService, store: Arc<dyn BlogStore>) -> Router {
    Arc::new(CalculatorService)
        .routes()
        .merge(Arc::new(greet).routes())
        .merge(Arc::new(BlogService::new(store)).routes())
}

/// Decodes a request payload; malformed input is `INVALID_ARGUMENT`.
pub(crate) fn decode<T: DeserializeOwned>(payload: Payload) -> Result<T, Status> {
    serde_json::from_value(payload).map_err(|e| Status::invalid_argument(format!("malformed request: {}", e)))
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Payload, Status> {
    serde_json::to_value(value).map_err(|e| Status::internal(format!("cannot encode response: {}", e)))
}

/// Receives the single request of a unary or server-streaming call.
pub(crate) async fn single_request<T: DeserializeOwned>(call: &CallHandle) -> Result<T, Status> {
    match call.recv().await {
        Ok(Some(payload)) => decode(payload),
        Ok(None) => Err(Status::invalid_argument("missing request message")),
        Err(e) => Err(e.into_status()),
    }
}

/// Receives the next streamed request, `None` at end of stream.
pub(crate) async fn next_request<T: DeserializeOwned>(call: &CallHandle) -> Result<Option<T>, Status> {
    match call.recv().await {
        Ok(Some(payload)) => decode(payload).map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(e.into_status()),
    }
}

pub(crate) async fn send_response<T: Serialize>(call: &CallHandle, value: &T) -> Result<(), Status> {
    call.send(encode(value)?).await.map_err(CallError::into_status)
}
