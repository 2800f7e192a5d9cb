//! QuadRPC Integration Tests
//!
//! End-to-end tests that run the demo services through the whole stack:
//! client call, framing, bridge, server dispatch and handler. Connections
//! are in-memory `tokio::io::duplex` pipes, so tests that depend on time
//! can run with a paused clock.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use quadrpc::call::CallHandle;
use quadrpc::client::{CallOptions, ClientCall, QuadrpcClient};
use quadrpc::common::{Code, Outcome, Pattern, Status};
use quadrpc::server::services::{demo_router, GreetService};
use quadrpc::server::{MemoryBlogStore, Router, Server};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Serves each call on a fresh duplex pipe.
struct Harness {
    server: Arc<Server>,
    client: QuadrpcClient,
}

impl Harness {
    fn new(router: Router) -> Self {
        Self {
            server: Arc::new(Server::new(router)),
            client: QuadrpcClient::new("duplex"),
        }
    }

    fn demo() -> Self {
        Self::new(demo_router(GreetService::new(), Arc::new(MemoryBlogStore::new())))
    }

    async fn open(&self, method: &str, pattern: Pattern, options: CallOptions) -> ClientCall {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let server = Arc::clone(&self.server);
        tokio::spawn(async move { server.serve_connection(server_io).await });
        self.client
            .call_over(client_io, method, pattern, options)
            .await
            .unwrap()
    }

    async fn unary(&self, method: &str, request: Value) -> Outcome {
        self.open(method, Pattern::Unary, CallOptions::new())
            .await
            .unary(request)
            .await
    }
}

// ============================================================================
// Reference Scenarios
// ============================================================================

#[tokio::test]
async fn test_scenario_unary_sum() {
    let harness = Harness::demo();
    let sum = harness.unary("calculator.sum", json!({"a": 5, "b": 45})).await;
    assert_eq!(sum, Ok(json!({"sum": 50})));
}

#[tokio::test]
async fn test_scenario_server_stream_decomposition() {
    let harness = Harness::demo();
    let call = harness
        .open("calculator.prime_decomposition", Pattern::ServerStream, CallOptions::new())
        .await;
    call.send(json!({"number": 12})).await.unwrap();

    let mut factors = Vec::new();
    while let Some(message) = call.recv().await.unwrap() {
        factors.push(message["factor"].as_u64().unwrap());
    }
    assert_eq!(factors, vec![2, 2, 3]);
    assert_eq!(call.wait().await, Ok(Value::Null));
}

#[tokio::test]
async fn test_scenario_client_stream_average() {
    let harness = Harness::demo();
    let call = harness
        .open("calculator.compute_average", Pattern::ClientStream, CallOptions::new())
        .await;
    for number in 1..=6 {
        call.send(json!({"number": number})).await.unwrap();
    }
    call.close_send();
    assert_eq!(call.wait().await, Ok(json!({"average": 3.5})));
}

#[tokio::test]
async fn test_scenario_unary_invalid_argument() {
    let harness = Harness::demo();
    let status = harness
        .unary("calculator.square_root", json!({"number": -25}))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_bidi_deadline() {
    let harness = Harness::demo();
    let options = CallOptions::new().with_timeout(Duration::from_secs(2));
    let call = harness
        .open("greet.greet_everyone", Pattern::BidiStream, options)
        .await;

    let mut replies = 0;
    for name in ["Stephane", "John", "Marc", "Patricia", "Lucy"] {
        if call.send(json!({"first_name": name})).await.is_err() {
            break;
        }
        match call.recv().await {
            Ok(Some(_)) => replies += 1,
            _ => break,
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    assert!(replies < 5);
    assert_eq!(call.wait().await.unwrap_err().code(), Code::DeadlineExceeded);
}

// ============================================================================
// Demo Services
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_greet_many_times_is_paced() {
    let harness = Harness::demo();
    let call = harness
        .open("greet.greet_many_times", Pattern::ServerStream, CallOptions::new())
        .await;
    call.send(json!({"first_name": "Ada"})).await.unwrap();

    let start = tokio::time::Instant::now();
    let greetings: Vec<_> = call.into_stream().collect().await;
    assert_eq!(greetings.len(), 10);
    assert!(greetings.iter().all(Result::is_ok));
    assert!(start.elapsed() >= Duration::from_secs(9));
}

#[tokio::test]
async fn test_long_greet() {
    let harness = Harness::demo();
    let call = harness
        .open("greet.long_greet", Pattern::ClientStream, CallOptions::new())
        .await;
    for name in ["Stephane", "John"] {
        call.send(json!({"first_name": name})).await.unwrap();
    }
    call.close_send();
    assert_eq!(
        call.wait().await,
        Ok(json!({"result": "Hello Stephane! John! "}))
    );
}

#[tokio::test]
async fn test_blog_round_trip() {
    let harness = Harness::demo();
    let created = harness
        .unary(
            "blog.create_blog",
            json!({"blog": {"author_id": "stephane", "title": "My First Blog", "content": "hello"}}),
        )
        .await
        .unwrap();
    let id = created["blog"]["id"].as_str().unwrap().to_string();

    let read = harness.unary("blog.read_blog", json!({"blog_id": id})).await;
    assert_eq!(read, Ok(created.clone()));

    let call = harness
        .open("blog.list_blog", Pattern::ServerStream, CallOptions::new())
        .await;
    call.send(json!({})).await.unwrap();
    let listed: Vec<_> = call.into_stream().collect().await;
    assert_eq!(listed, vec![Ok(created)]);

    let deleted = harness.unary("blog.delete_blog", json!({"blog_id": id})).await;
    assert_eq!(deleted, Ok(json!({"blog_id": id})));

    let missing = harness
        .unary("blog.read_blog", json!({"blog_id": id}))
        .await
        .unwrap_err();
    assert_eq!(missing.code(), Code::NotFound);
}

// ============================================================================
// Cancellation and Routing
// ============================================================================

#[tokio::test]
async fn test_client_cancel_reaches_handler() {
    let (observed_tx, mut observed_rx) = mpsc::unbounded_channel();
    let router = Router::new().route("wait.forever", Pattern::BidiStream, move |call: CallHandle| {
        let observed_tx = observed_tx.clone();
        async move {
            call.terminated().await;
            let _ = observed_tx.send(call.outcome());
            Err(Status::internal("handler gave up"))
        }
    });
    let harness = Harness::new(router);

    let call = harness
        .open("wait.forever", Pattern::BidiStream, CallOptions::new())
        .await;
    call.send(json!("hello")).await.unwrap();
    assert!(call.cancel());
    assert_eq!(call.wait().await.unwrap_err().code(), Code::Cancelled);

    let observed = observed_rx.recv().await.unwrap();
    assert_eq!(observed.unwrap().unwrap_err().code(), Code::Cancelled);
}

#[tokio::test]
async fn test_dropped_call_reaches_handler() {
    let (observed_tx, mut observed_rx) = mpsc::unbounded_channel();
    let router = Router::new().route("wait.forever", Pattern::ClientStream, move |call: CallHandle| {
        let observed_tx = observed_tx.clone();
        async move {
            call.terminated().await;
            let _ = observed_tx.send(call.outcome());
            Err(Status::internal("handler gave up"))
        }
    });
    let harness = Harness::new(router);

    let call = harness
        .open("wait.forever", Pattern::ClientStream, CallOptions::new())
        .await;
    drop(call);

    let observed = observed_rx.recv().await.unwrap();
    assert_eq!(observed.unwrap().unwrap_err().code(), Code::Cancelled);
}

#[tokio::test]
async fn test_unknown_method_and_pattern_mismatch() {
    let harness = Harness::demo();

    let unknown = harness.unary("calculator.divide", json!({})).await.unwrap_err();
    assert_eq!(unknown.code(), Code::Unimplemented);

    let mismatch = harness
        .open("calculator.sum", Pattern::BidiStream, CallOptions::new())
        .await
        .wait()
        .await
        .unwrap_err();
    assert_eq!(mismatch.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_info_lists_methods() {
    let harness = Harness::demo();
    let info = harness.unary("_info", json!({})).await.unwrap();
    assert_eq!(info["methods"]["calculator.sum"], "unary");
    assert_eq!(info["methods"]["greet.greet_everyone"], "bidi_stream");
    assert_eq!(info["methods"]["blog.list_blog"], "server_stream");
}
