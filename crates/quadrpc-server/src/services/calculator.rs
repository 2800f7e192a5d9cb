use std::sync::Arc;

use quadrpc_common::{Outcome, Pattern, Payload, Status};
use quadrpc_core::CallHandle;
use serde::{Deserialize, Serialize};

use super::{encode, next_request, send_response, single_request};
use crate::router::Router;

#[derive(Debug, Deserialize)]
pub struct SumRequest {
    pub a: i64,
    pub b: i64,
}

#[derive(Debug, Serialize)]
pub struct SumResponse {
    pub sum: i64,
}

#[derive(Debug, Deserialize)]
pub struct NumberRequest {
    pub number: i64,
}

#[derive(Debug, Deserialize)]
pub struct DecompositionRequest {
    pub number: u64,
}

#[derive(Debug, Serialize)]
pub struct FactorResponse {
    pub factor: u64,
}

#[derive(Debug, Serialize)]
pub struct AverageResponse {
    pub average: f64,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub root: f64,
}

/// Arithmetic over each of the call patterns.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalculatorService;

impl CalculatorService {
    pub fn routes(self: Arc<Self>) -> Router {
        let sum = Arc::clone(&self);
        let decomposition = Arc::clone(&self);
        let average = Arc::clone(&self);
        let root = self;

        Router::new()
            .route("calculator.sum", Pattern::Unary, move |call: CallHandle| {
                let svc = Arc::clone(&sum);
                async move { svc.sum(call).await }
            })
            .route("calculator.prime_decomposition", Pattern::ServerStream, move |call: CallHandle| {
                let svc = Arc::clone(&decomposition);
                async move { svc.prime_decomposition(call).await }
            })
            .route("calculator.compute_average", Pattern::ClientStream, move |call: CallHandle| {
                let svc = Arc::clone(&average);
                async move { svc.compute_average(call).await }
            })
            .route("calculator.square_root", Pattern::Unary, move |call: CallHandle| {
                let svc = Arc::clone(&root);
                async move { svc.square_root(call).await }
            })
    }

    pub async fn sum(&self, call: CallHandle) -> Outcome {
        let request: SumRequest = single_request(&call).await?;
        let sum = request
            .a
            .checked_add(request.b)
            .ok_or_else(|| Status::invalid_argument("sum overflows a 64-bit integer"))?;
        encode(&SumResponse { sum })
    }

    /// Streams the prime factors of `number` in ascending order. Numbers
    /// below 2 have none.
    pub async fn prime_decomposition(&self, call: CallHandle) -> Outcome {
        let request: DecompositionRequest = single_request(&call).await?;
        tracing::debug!(number = request.number, "decomposing");

        let mut n = request.number;
        let mut k = 2u64;
        while n > 1 {
            if n % k == 0 {
                send_response(&call, &FactorResponse { factor: k }).await?;
                n /= k;
            } else if k.saturating_mul(k) > n {
                // n itself is prime
                k = n;
            } else {
                k += 1;
            }
        }

        call.close_send();
        Ok(Payload::Null)
    }

    pub async fn compute_average(&self, call: CallHandle) -> Outcome {
        let mut sum = 0i128;
        let mut count = 0u64;
        while let Some(request) = next_request::<NumberRequest>(&call).await? {
            sum += i128::from(request.number);
            count += 1;
        }

        if count == 0 {
            return Err(Status::invalid_argument("cannot average an empty stream"));
        }
        encode(&AverageResponse {
            average: sum as f64 / count as f64,
        })
    }

    pub async fn square_root(&self, call: CallHandle) -> Outcome {
        let request: NumberRequest = single_request(&call).await?;
        if request.number < 0 {
            return Err(Status::invalid_argument(format!(
                "received a negative number: {}",
                request.number
            )));
        }
        encode(&RootResponse {
            root: (request.number as f64).sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadrpc_common::{ChannelConfig, Code};
    use quadrpc_core::begin_call;
    use serde_json::json;

    #[tokio::test]
    async fn test_sum() {
        let (caller, responder) = begin_call(Pattern::Unary, None, &ChannelConfig::default());
        caller.send(json!({"a": 5, "b": 45})).await.unwrap();
        assert_eq!(CalculatorService.sum(responder).await, Ok(json!({"sum": 50})));
    }

    #[tokio::test]
    async fn test_sum_rejects_non_numeric_input() {
        let (caller, responder) = begin_call(Pattern::Unary, None, &ChannelConfig::default());
        caller.send(json!({"a": "five", "b": 45})).await.unwrap();
        let status = CalculatorService.sum(responder).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_prime_decomposition_of_large_prime_terminates() {
        let (caller, responder) = begin_call(Pattern::ServerStream, None, &ChannelConfig::default());
        caller.send(json!({"number": 1_000_000_007u64})).await.unwrap();

        let handler = tokio::spawn(async move { CalculatorService.prime_decomposition(responder).await });
        assert_eq!(caller.recv().await.unwrap(), Some(json!({"factor": 1_000_000_007u64})));
        assert_eq!(caller.recv().await.unwrap(), None);
        assert_eq!(handler.await.unwrap(), Ok(Payload::Null));
    }

    #[tokio::test]
    async fn test_prime_decomposition_rejects_negative() {
        let (caller, responder) = begin_call(Pattern::ServerStream, None, &ChannelConfig::default());
        caller.send(json!({"number": -12})).await.unwrap();
        let status = CalculatorService.prime_decomposition(responder).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_empty_average_is_invalid() {
        let (caller, responder) = begin_call(Pattern::ClientStream, None, &ChannelConfig::default());
        caller.close_send();
        let status = CalculatorService.compute_average(responder).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_square_root() {
        let (caller, responder) = begin_call(Pattern::Unary, None, &ChannelConfig::default());
        caller.send(json!({"number": 25})).await.unwrap();
        assert_eq!(CalculatorService.square_root(responder).await, Ok(json!({"root": 5.0})));
    }
}
