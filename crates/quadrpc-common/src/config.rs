//! Channel configuration.
//!
//! Message channels are bounded; their capacity is the only backpressure
//! mechanism between the two ends of a call.

/// Environment variable overriding the default channel capacity.
pub const CHANNEL_CAPACITY_ENV: &str = "QUADRPC_CHANNEL_CAPACITY";

/// Capacity of each direction of a call.
///
/// # Default Configuration
///
/// - `capacity`: 8 messages per direction
///
/// # Example
///
/// ```
/// use quadrpc_common::ChannelConfig;
///
/// let config = ChannelConfig::default().with_capacity(1);
/// assert_eq!(config.capacity, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Messages buffered per direction before senders suspend
    pub capacity: usize,
}

impl ChannelConfig {
    pub const DEFAULT_CAPACITY: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity. Zero is raised to one; a rendezvous channel
    /// would make a lone sender wait forever.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Default configuration overridden by `QUADRPC_CHANNEL_CAPACITY` when set.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(CHANNEL_CAPACITY_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        let config = Self::default();
        match value {
            None => config,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(capacity) => config.with_capacity(capacity),
                Err(e) => {
                    tracing::warn!(
                        value = raw,
                        error = %e,
                        "ignoring invalid {}",
                        CHANNEL_CAPACITY_ENV
                    );
                    config
                }
            },
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
        }
    }
}
