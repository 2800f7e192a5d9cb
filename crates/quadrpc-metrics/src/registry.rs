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

use crate::snapshot::{MethodMetrics, MetricsSnapshot};
use quadrpc_common::Code;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::{Duration, Instant};

/// Error codes tracked per method, in wire order.
const TRACKED_CODES: [Code; 7] = [
    Code::Cancelled,
    Code::Unknown,
    Code::InvalidArgument,
    Code::DeadlineExceeded,
    Code::NotFound,
    Code::Unimplemented,
    Code::Internal,
];

fn code_slot(code: Code) -> usize {
    match code {
        Code::Cancelled => 0,
        Code::Unknown => 1,
        Code::InvalidArgument => 2,
        Code::DeadlineExceeded => 3,
        Code::NotFound => 4,
        Code::Unimplemented => 5,
        Code::Internal => 6,
    }
}

/// Limits on what the registry keeps.
///
/// # Example
///
/// ```rust
/// use quadrpc_metrics::MetricsConfig;
///
/// let config = MetricsConfig { max_methods: 50 };
/// # let _ = config;
/// ```
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Maximum number of distinct methods to track
    ///
    /// When exceeded, the least recently used method is evicted.
    pub max_methods: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { max_methods: 1000 }
    }
}

/// Counters for one method.
#[derive(Debug)]
struct MethodStats {
    call_count: AtomicU64,
    ok_count: AtomicU64,
    errors: [AtomicU64; TRACKED_CODES.len()],
    total_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
    /// Value of the registry's access clock at the last call
    last_access: AtomicU64,
}

impl MethodStats {
    fn new(now: u64) -> Self {
        Self {
            call_count: AtomicU64::new(0),
            ok_count: AtomicU64::new(0),
            errors: std::array::from_fn(|_| AtomicU64::new(0)),
            total_latency_us: AtomicU64::new(0),
            max_latency_us: AtomicU64::new(0),
            last_access: AtomicU64::new(now),
        }
    }

    fn record(&self, latency_us: u64, result: Result<(), Code>, now: u64) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(()) => self.ok_count.fetch_add(1, Ordering::Relaxed),
            Err(code) => self.errors[code_slot(code)].fetch_add(1, Ordering::Relaxed),
        };
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(latency_us, Ordering::Relaxed);
        self.last_access.store(now, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MethodMetrics {
        let call_count = self.call_count.load(Ordering::Relaxed);
        let ok_count = self.ok_count.load(Ordering::Relaxed);

        let errors_by_code: BTreeMap<String, u64> = TRACKED_CODES
            .iter()
            .map(|code| (code.as_str().to_string(), self.errors[code_slot(*code)].load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        let error_count = errors_by_code.values().sum();

        let avg_latency_us = if call_count == 0 {
            0
        } else {
            self.total_latency_us.load(Ordering::Relaxed) / call_count
        };

        MethodMetrics {
            call_count,
            ok_count,
            error_count,
            errors_by_code,
            avg_latency_us,
            max_latency_us: self.max_latency_us.load(Ordering::Relaxed),
        }
    }
}

/// Thread-safe store of call metrics.
///
/// Counters are atomics; the method table sits behind an `RwLock` that is
/// only written when a method is seen for the first time or evicted.
#[derive(Debug)]
pub struct MetricsRegistry {
    total_calls: AtomicU64,
    ok_calls: AtomicU64,
    failed_calls: AtomicU64,
    active_calls: AtomicU64,
    methods: StdRwLock<HashMap<String, Arc<MethodStats>>>,
    access_clock: AtomicU64,
    start_time: Instant,
    config: MetricsConfig,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_config(MetricsConfig::default())
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            ok_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            active_calls: AtomicU64::new(0),
            methods: StdRwLock::new(HashMap::new()),
            access_clock: AtomicU64::new(0),
            start_time: Instant::now(),
            config,
        }
    }

    pub fn call_started(&self) {
        self.active_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn call_finished(&self) {
        // Saturating so an unmatched finish cannot wrap the gauge.
        let _ = self
            .active_calls
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
    }

    /// Records one finished call of `method`.
    ///
    /// `result` is `Err(code)` for calls that ended with an error status.
    ///
    /// # Example
    /// ```rust
    /// use quadrpc_common::Code;
    /// use quadrpc_metrics::MetricsRegistry;
    /// use std::time::Duration;
    ///
    /// let registry = MetricsRegistry::new();
    /// registry.record_method_call("calculator.sum", Duration::from_micros(40), Ok(()));
    /// registry.record_method_call("calculator.square_root", Duration::from_micros(25), Err(Code::InvalidArgument));
    /// assert_eq!(registry.snapshot().failed_calls, 1);
    /// ```
    pub fn record_method_call(&self, method: &str, latency: Duration, result: Result<(), Code>) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(()) => self.ok_calls.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed_calls.fetch_add(1, Ordering::Relaxed),
        };

        let now = self.access_clock.fetch_add(1, Ordering::Relaxed) + 1;
        let stats = self.method_stats(method, now);
        stats.record(latency.as_micros() as u64, result, now);
    }

    fn method_stats(&self, method: &str, now: u64) -> Arc<MethodStats> {
        {
            let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(stats) = methods.get(method) {
                return Arc::clone(stats);
            }
        }

        let mut methods = self.methods.write().unwrap_or_else(PoisonError::into_inner);
        if !methods.contains_key(method) && methods.len() >= self.config.max_methods.max(1) {
            let oldest = methods
                .iter()
                .min_by_key(|(_, stats)| stats.last_access.load(Ordering::Relaxed))
                .map(|(name, _)| name.clone());
            if let Some(oldest) = oldest {
                methods.remove(&oldest);
            }
        }
        Arc::clone(
            methods
                .entry(method.to_string())
                .or_insert_with(|| Arc::new(MethodStats::new(now))),
        )
    }

    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let methods = {
            let guard = self.methods.read().unwrap_or_else(PoisonError::into_inner);
            guard
                .iter()
                .map(|(name, stats)| (name.clone(), stats.snapshot()))
                .collect()
        };

        MetricsSnapshot {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            ok_calls: self.ok_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            active_calls: self.active_calls.load(Ordering::Relaxed),
            uptime_ms: self.uptime_ms(),
            methods,
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
