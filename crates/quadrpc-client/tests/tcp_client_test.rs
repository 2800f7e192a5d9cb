//! TCP Client Integration Tests
//!
//! These tests run the demo services behind a real `TcpServer` on a random
//! loopback port and drive every call pattern through `QuadrpcClient`.
//!
//! Use `127.0.0.1` rather than `localhost` to avoid DNS resolution issues.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use quadrpc_client::{CallOptions, QuadrpcClient};
use quadrpc_common::Code;
use quadrpc_server::services::{demo_router, GreetService};
use quadrpc_server::{MemoryBlogStore, Server, TcpServer};
use serde_json::json;

/// Starts the demo server and returns a client for it.
async fn start_server() -> QuadrpcClient {
    let greet = GreetService::new().with_interval(Duration::from_millis(100));
    let router = demo_router(greet, Arc::new(MemoryBlogStore::new()));
    let server = Arc::new(Server::new(router));

    let tcp = TcpServer::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    tokio::spawn(async move { tcp.run(server).await });

    QuadrpcClient::new(addr.to_string())
}

#[tokio::test]
async fn test_unary_sum() {
    let client = start_server().await;
    let sum = client
        .unary("calculator.sum", json!({"a": 10, "b": 40}), CallOptions::new())
        .await;
    assert_eq!(sum, Ok(json!({"sum": 50})));
}

#[tokio::test]
async fn test_unary_error_status() {
    let client = start_server().await;
    let status = client
        .unary("calculator.square_root", json!({"number": -25}), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "received a negative number: -25");
}

#[tokio::test]
async fn test_server_streaming_factors() {
    let client = start_server().await;
    let call = client
        .server_streaming("calculator.prime_decomposition", json!({"number": 120}), CallOptions::new())
        .await
        .unwrap();

    let factors: Vec<u64> = call
        .into_stream()
        .map(|item| item.unwrap()["factor"].as_u64().unwrap())
        .collect()
        .await;
    assert_eq!(factors, vec![2, 2, 2, 3, 5]);
}

#[tokio::test]
async fn test_client_streaming_average() {
    let client = start_server().await;
    let call = client
        .client_streaming("calculator.compute_average", CallOptions::new())
        .await
        .unwrap();
    for number in [1, 2, 3, 4] {
        call.send(json!({"number": number})).await.unwrap();
    }
    call.close_send();
    assert_eq!(call.wait().await, Ok(json!({"average": 2.5})));
}

#[tokio::test]
async fn test_bidi_greet_everyone() {
    let client = start_server().await;
    let call = client
        .bidi_streaming("greet.greet_everyone", CallOptions::new())
        .await
        .unwrap();

    for name in ["Ada", "Grace", "Barbara"] {
        call.send(json!({"first_name": name})).await.unwrap();
        let reply = call.recv().await.unwrap().unwrap();
        assert_eq!(reply, json!({"result": format!("Hello {}!", name)}));
    }
    call.close_send();
    assert_eq!(call.recv().await.unwrap(), None);
    assert!(call.finish().await.is_ok());
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let client = start_server().await;
    let options = CallOptions::new().with_timeout(Duration::from_millis(50));
    let status = client
        .unary("greet.greet_with_deadline", json!({"first_name": "Ada"}), options)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::DeadlineExceeded);
}

#[tokio::test]
async fn test_deadline_met() {
    let client = start_server().await;
    let options = CallOptions::new().with_timeout(Duration::from_secs(5));
    let greeting = client
        .unary("greet.greet_with_deadline", json!({"first_name": "Ada"}), options)
        .await;
    assert_eq!(greeting, Ok(json!({"result": "Hello Ada"})));
}

#[tokio::test]
async fn test_unknown_method() {
    let client = start_server().await;
    let status = client
        .unary("calculator.divide", json!({}), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);
}

#[tokio::test]
async fn test_metrics_builtin() {
    let client = start_server().await;
    client
        .unary("calculator.sum", json!({"a": 1, "b": 2}), CallOptions::new())
        .await
        .unwrap();

    // The server records a call just after writing its status frame.
    let mut recorded = false;
    for _ in 0..50 {
        let metrics = client.unary("_metrics", json!({}), CallOptions::new()).await.unwrap();
        if metrics["methods"]["calculator.sum"]["call_count"] == json!(1) {
            recorded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(recorded);
}
