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

use crate::registry::{MetricsConfig, MetricsRegistry};
use crate::snapshot::{MetricsSnapshot, ServerInfo};
use quadrpc_common::{Code, Payload, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Method answered with a [`MetricsSnapshot`].
pub const METRICS_METHOD: &str = "_metrics";
/// Method answered with a [`ServerInfo`].
pub const INFO_METHOD: &str = "_info";

/// Metrics collection for QuadRPC servers.
///
/// Besides recording calls, a collector answers the built-in unary methods
/// `_metrics` and `_info`, which are intercepted before routing.
///
/// # Example
///
/// ```rust
/// use quadrpc_metrics::{MetricsCollector, ServerMetricsCollector};
/// use std::time::Instant;
///
/// let collector = ServerMetricsCollector::new();
/// assert!(collector.is_metrics_request("_metrics"));
///
/// let start = Instant::now();
/// // ... run the call ...
/// collector.record_call("calculator.sum", start, Ok(()));
/// assert_eq!(collector.snapshot().total_calls, 1);
/// ```
pub trait MetricsCollector: Send + Sync {
    /// Returns `true` for `_metrics` and `_info`.
    fn is_metrics_request(&self, method: &str) -> bool;

    /// Builds the response payload for a built-in method.
    ///
    /// `methods` maps registered method names to their pattern names and is
    /// reported by `_info`. Returns `None` for any other method.
    fn handle_metrics_request(
        &self,
        method: &str,
        methods: &BTreeMap<String, String>,
    ) -> Option<Result<Payload>>;

    /// Records a finished call; `result` carries the error code, if any.
    fn record_call(&self, method: &str, start_time: Instant, result: std::result::Result<(), Code>);

    /// Marks a call as in flight until `record_call` is invoked for it.
    fn call_started(&self);

    fn snapshot(&self) -> MetricsSnapshot;
}

/// Metrics collector used by `quadrpc-server`.
pub struct ServerMetricsCollector {
    registry: Arc<MetricsRegistry>,
}

impl ServerMetricsCollector {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        Self {
            registry: Arc::new(MetricsRegistry::with_config(config)),
        }
    }

    /// Shares an existing registry.
    pub fn with_registry(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }
}

impl Default for ServerMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector for ServerMetricsCollector {
    fn is_metrics_request(&self, method: &str) -> bool {
        method == METRICS_METHOD || method == INFO_METHOD
    }

    fn handle_metrics_request(
        &self,
        method: &str,
        methods: &BTreeMap<String, String>,
    ) -> Option<Result<Payload>> {
        let payload = match method {
            METRICS_METHOD => serde_json::to_value(self.registry.snapshot()),
            INFO_METHOD => serde_json::to_value(ServerInfo::new(self.registry.uptime_ms(), methods.clone())),
            _ => return None,
        };
        Some(payload.map_err(Into::into))
    }

    fn record_call(&self, method: &str, start_time: Instant, result: std::result::Result<(), Code>) {
        self.registry
            .record_method_call(method, start_time.elapsed(), result);
        self.registry.call_finished();
    }

    fn call_started(&self) {
        self.registry.call_started();
    }

    fn snapshot(&self) -> MetricsSnapshot {
        self.registry.snapshot()
    }
}
