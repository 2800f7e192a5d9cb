use std::sync::Arc;
use std::time::Duration;

use quadrpc_common::{Outcome, Pattern, Payload, Status};
use quadrpc_core::CallHandle;
use serde::{Deserialize, Serialize};

use super::{encode, next_request, send_response, single_request};
use crate::router::Router;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GreetRequest {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GreetResponse {
    pub result: String,
}

impl GreetResponse {
    fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

/// Greetings over each of the call patterns.
///
/// `interval` paces `greet_many_times` and is the length of one unit of
/// work in `greet_with_deadline`.
#[derive(Debug, Clone)]
pub struct GreetService {
    interval: Duration,
}

impl Default for GreetService {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

impl GreetService {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
    pub const MANY_TIMES: usize = 10;
    pub const DEADLINE_TICKS: usize = 3;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn routes(self: Arc<Self>) -> Router {
        let greet = Arc::clone(&self);
        let many = Arc::clone(&self);
        let long = Arc::clone(&self);
        let everyone = Arc::clone(&self);
        let deadline = self;

        Router::new()
            .route("greet.greet", Pattern::Unary, move |call: CallHandle| {
                let svc = Arc::clone(&greet);
                async move { svc.greet(call).await }
            })
            .route("greet.greet_many_times", Pattern::ServerStream, move |call: CallHandle| {
                let svc = Arc::clone(&many);
                async move { svc.greet_many_times(call).await }
            })
            .route("greet.long_greet", Pattern::ClientStream, move |call: CallHandle| {
                let svc = Arc::clone(&long);
                async move { svc.long_greet(call).await }
            })
            .route("greet.greet_everyone", Pattern::BidiStream, move |call: CallHandle| {
                let svc = Arc::clone(&everyone);
                async move { svc.greet_everyone(call).await }
            })
            .route("greet.greet_with_deadline", Pattern::Unary, move |call: CallHandle| {
                let svc = Arc::clone(&deadline);
                async move { svc.greet_with_deadline(call).await }
            })
    }

    pub async fn greet(&self, call: CallHandle) -> Outcome {
        let request: GreetRequest = single_request(&call).await?;
        encode(&GreetResponse::new(format!("Hello {}", request.first_name)))
    }

    pub async fn greet_many_times(&self, call: CallHandle) -> Outcome {
        let request: GreetRequest = single_request(&call).await?;

        for i in 0..Self::MANY_TIMES {
            let greeting = GreetResponse::new(format!("Hello {} number {}", request.first_name, i));
            send_response(&call, &greeting).await?;
            self.pause(&call).await?;
        }

        call.close_send();
        Ok(Payload::Null)
    }

    pub async fn long_greet(&self, call: CallHandle) -> Outcome {
        let mut result = String::from("Hello ");
        while let Some(request) = next_request::<GreetRequest>(&call).await? {
            result.push_str(&request.first_name);
            result.push_str("! ");
        }
        encode(&GreetResponse::new(result))
    }

    /// Replies to every greeting as it arrives.
    pub async fn greet_everyone(&self, call: CallHandle) -> Outcome {
        while let Some(request) = next_request::<GreetRequest>(&call).await? {
            let reply = GreetResponse::new(format!("Hello {}!", request.first_name));
            send_response(&call, &reply).await?;
        }
        call.close_send();
        Ok(Payload::Null)
    }

    /// Works for three intervals before answering, giving up as soon as
    /// the call is cancelled or its deadline passes.
    pub async fn greet_with_deadline(&self, call: CallHandle) -> Outcome {
        let request: GreetRequest = single_request(&call).await?;

        for _ in 0..Self::DEADLINE_TICKS {
            if self.pause(&call).await.is_err() {
                tracing::debug!(call_id = call.id(), "caller gave up on greet_with_deadline");
                return Err(Status::cancelled("the client cancelled the request"));
            }
        }

        encode(&GreetResponse::new(format!("Hello {}", request.first_name)))
    }

    /// Sleeps one interval, returning early with the call's status if it
    /// ends meanwhile.
    async fn pause(&self, call: &CallHandle) -> Result<(), Status> {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => Ok(()),
            _ = call.terminated() => Err(match call.outcome() {
                Some(Err(status)) => status,
                _ => Status::cancelled("call ended"),
            }),
        }
    }
}
