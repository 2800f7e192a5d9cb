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

//! QuadRPC Metrics
//!
//! Call metrics for QuadRPC servers.
//!
//! # Features
//!
//! - **Lock-free counters**: atomics on the hot path
//! - **Per-code failures**: every failed call is counted under its status code
//! - **Built-in methods**: `_metrics` and `_info` answered by the collector
//! - **Bounded memory**: least recently used methods are evicted past a limit
//!
//! # Usage Example
//!
//! ```rust
//! use quadrpc_common::Code;
//! use quadrpc_metrics::{MetricsCollector, ServerMetricsCollector};
//! use std::time::Instant;
//!
//! let collector = ServerMetricsCollector::new();
//!
//! let start = Instant::now();
//! collector.record_call("calculator.square_root", start, Err(Code::InvalidArgument));
//!
//! let snapshot = collector.snapshot();
//! assert_eq!(snapshot.methods["calculator.square_root"].errors_by_code["INVALID_ARGUMENT"], 1);
//! ```

mod collector;
mod registry;
mod snapshot;

pub use collector::{MetricsCollector, ServerMetricsCollector, INFO_METHOD, METRICS_METHOD};
pub use registry::{MetricsConfig, MetricsRegistry};
pub use snapshot::{MethodMetrics, MetricsSnapshot, ServerInfo};
