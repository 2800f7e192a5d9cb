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

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Server information returned by the `_info` method
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    pub version: String,
    pub uptime_ms: u64,
    /// Registered methods and their call patterns
    pub methods: BTreeMap<String, String>,
}

impl ServerInfo {
    pub fn new(uptime_ms: u64, methods: BTreeMap<String, String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_ms,
            methods,
        }
    }
}

/// Metrics for a specific method
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodMetrics {
    pub call_count: u64,
    pub ok_count: u64,
    pub error_count: u64,
    /// Failed calls keyed by terminal status code name
    pub errors_by_code: BTreeMap<String, u64>,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
}

impl MethodMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Complete metrics snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_calls: u64,
    pub ok_calls: u64,
    pub failed_calls: u64,
    pub active_calls: u64,
    pub uptime_ms: u64,
    pub methods: HashMap<String, MethodMetrics>,
}

impl MetricsSnapshot {
    pub fn new(uptime_ms: u64) -> Self {
        Self {
            uptime_ms,
            ..Self::default()
        }
    }
}
