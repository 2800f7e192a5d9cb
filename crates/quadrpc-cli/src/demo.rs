// Copyright 2025 QuadRPC Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! In-process run of the reference scenarios.
//!
//! Every scenario serves one call of the demo services over an in-memory
//! `tokio::io::duplex` pipe, going through the same framing, bridge and
//! client code as a TCP connection would.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use quadrpc_client::{CallOptions, ClientCall, QuadrpcClient};
use quadrpc_common::{Code, Outcome, Pattern, Status};
use quadrpc_server::services::{demo_router, GreetService};
use quadrpc_server::{MemoryBlogStore, Server};
use serde_json::json;

/// Names sent one at a time in the bidirectional scenario.
pub const NAMES: [&str; 5] = ["Stephane", "John", "Marc", "Patricia", "Lucy"];

const PIPE_CAPACITY: usize = 64 * 1024;

/// Timing of the deadline scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoConfig {
    /// Pause between two names of the bidirectional scenario.
    pub pacing: Duration,
    /// Deadline of the bidirectional scenario.
    pub deadline: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_secs(1),
            deadline: Duration::from_secs(2),
        }
    }
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub name: &'static str,
    /// What the call produced, for display.
    pub observed: String,
    pub passed: bool,
}

impl ScenarioReport {
    fn new(name: &'static str, observed: impl Into<String>, passed: bool) -> Self {
        Self {
            name,
            observed: observed.into(),
            passed,
        }
    }
}

/// Runs every scenario in order and reports each.
pub async fn run_scenarios(config: DemoConfig) -> Vec<ScenarioReport> {
    let demo = Demo::new();
    vec![
        demo.unary_sum().await,
        demo.server_stream_factors().await,
        demo.client_stream_average().await,
        demo.unary_invalid_argument().await,
        demo.bidi_deadline(config).await,
    ]
}

struct Demo {
    server: Arc<Server>,
    client: QuadrpcClient,
}

impl Demo {
    fn new() -> Self {
        let router = demo_router(GreetService::new(), Arc::new(MemoryBlogStore::new()));
        Self {
            server: Arc::new(Server::new(router)),
            // never dialed; calls go over `call_over`
            client: QuadrpcClient::new("in-process"),
        }
    }

    async fn open(&self, method: &str, pattern: Pattern, options: CallOptions) -> Result<ClientCall, Status> {
        let (client_io, server_io) = tokio::io::duplex(PIPE_CAPACITY);
        let server = Arc::clone(&self.server);
        tokio::spawn(async move {
            if let Err(e) = server.serve_connection(server_io).await {
                tracing::warn!(error = %e, "demo connection failed");
            }
        });
        self.client.call_over(client_io, method, pattern, options).await
    }

    async fn unary(&self, method: &str, request: serde_json::Value) -> Outcome {
        let call = self.open(method, Pattern::Unary, CallOptions::new()).await?;
        call.unary(request).await
    }

    async fn unary_sum(&self) -> ScenarioReport {
        let outcome = self.unary("calculator.sum", json!({"a": 5, "b": 45})).await;
        let passed = outcome == Ok(json!({"sum": 50}));
        ScenarioReport::new("unary sum of 5 and 45", describe(&outcome), passed)
    }

    async fn server_stream_factors(&self) -> ScenarioReport {
        const NAME: &str = "server stream prime factors of 12";

        let call = match self
            .open("calculator.prime_decomposition", Pattern::ServerStream, CallOptions::new())
            .await
        {
            Ok(call) => call,
            Err(status) => return ScenarioReport::new(NAME, status.to_string(), false),
        };
        if let Err(e) = call.send(json!({"number": 12})).await {
            return ScenarioReport::new(NAME, e.to_string(), false);
        }

        let items: Vec<_> = call.into_stream().collect().await;
        let mut factors = Vec::new();
        for item in items {
            match item {
                Ok(message) => factors.push(message["factor"].clone()),
                Err(e) => return ScenarioReport::new(NAME, e.to_string(), false),
            }
        }
        let passed = factors == vec![json!(2), json!(2), json!(3)];
        ScenarioReport::new(NAME, format!("{} then end of stream", json!(factors)), passed)
    }

    async fn client_stream_average(&self) -> ScenarioReport {
        const NAME: &str = "client stream average of 1..=6";

        let call = match self
            .open("calculator.compute_average", Pattern::ClientStream, CallOptions::new())
            .await
        {
            Ok(call) => call,
            Err(status) => return ScenarioReport::new(NAME, status.to_string(), false),
        };
        for number in 1..=6 {
            if call.send(json!({"number": number})).await.is_err() {
                break;
            }
        }
        call.close_send();

        let outcome = call.wait().await;
        let passed = outcome == Ok(json!({"average": 3.5}));
        ScenarioReport::new(NAME, describe(&outcome), passed)
    }

    async fn unary_invalid_argument(&self) -> ScenarioReport {
        let outcome = self.unary("calculator.square_root", json!({"number": -25})).await;
        let passed = matches!(&outcome, Err(status) if status.code() == Code::InvalidArgument);
        ScenarioReport::new("unary square root of -25", describe(&outcome), passed)
    }

    /// Sends one name per `pacing` under `deadline`; the deadline ends the
    /// call before every name made the round trip.
    async fn bidi_deadline(&self, config: DemoConfig) -> ScenarioReport {
        const NAME: &str = "bidi greetings under a deadline";

        let options = CallOptions::new().with_timeout(config.deadline);
        let call = match self.open("greet.greet_everyone", Pattern::BidiStream, options).await {
            Ok(call) => call,
            Err(status) => return ScenarioReport::new(NAME, status.to_string(), false),
        };

        let mut replies = 0;
        for name in NAMES {
            if call.send(json!({"first_name": name})).await.is_err() {
                break;
            }
            match call.recv().await {
                Ok(Some(reply)) => {
                    tracing::info!(%reply, "greeting received");
                    replies += 1;
                }
                _ => break,
            }
            tokio::select! {
                _ = tokio::time::sleep(config.pacing) => {}
                _ = call.handle().terminated() => break,
            }
        }
        call.close_send();

        let outcome = call.wait().await;
        let passed = replies < NAMES.len()
            && matches!(&outcome, Err(status) if status.code() == Code::DeadlineExceeded);
        ScenarioReport::new(
            NAME,
            format!("{} of {} replies, then {}", replies, NAMES.len(), describe(&outcome)),
            passed,
        )
    }
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Ok(value) => format!("ok {}", value),
        Err(status) => format!("error {}", status),
    }
}
