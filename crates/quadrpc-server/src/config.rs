//! Server configuration.

use std::time::Duration;

use quadrpc_common::ChannelConfig;

/// Configuration applied to every call a server accepts.
///
/// # Fields
///
/// - `channel` - capacity of each direction of a call
/// - `max_call_time` - upper bound on a call's lifetime. A caller-supplied
///   timeout longer than this is shortened; a call without a timeout gets
///   this one. `None` leaves calls unbounded.
///
/// # Example
///
/// ```
/// use quadrpc_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new()
///     .with_max_call_time(Duration::from_secs(30));
/// assert_eq!(config.max_call_time, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
    pub channel: ChannelConfig,
    pub max_call_time: Option<Duration>,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_max_call_time(mut self, max_call_time: Duration) -> Self {
        self.max_call_time = Some(max_call_time);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_call_time` is zero or longer than one hour.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(limit) = self.max_call_time {
            if limit.is_zero() {
                return Err("max call time must be greater than zero".to_string());
            }
            if limit.as_secs() > 3600 {
                return Err(format!(
                    "max call time must be <= 1 hour (got {} seconds)",
                    limit.as_secs()
                ));
            }
        }
        Ok(())
    }

    /// Timeout to enforce for a call that asked for `requested`.
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Option<Duration> {
        match (requested, self.max_call_time) {
            (Some(requested), Some(limit)) => Some(requested.min(limit)),
            (requested, limit) => requested.or(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.channel.capacity, ChannelConfig::DEFAULT_CAPACITY);
        assert_eq!(config.max_call_time, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_and_huge_limits() {
        assert!(ServerConfig::new().with_max_call_time(Duration::ZERO).validate().is_err());
        assert!(ServerConfig::new()
            .with_max_call_time(Duration::from_secs(3601))
            .validate()
            .is_err());
    }

    #[test]
    fn test_effective_timeout() {
        let unbounded = ServerConfig::new();
        assert_eq!(unbounded.effective_timeout(None), None);
        assert_eq!(
            unbounded.effective_timeout(Some(Duration::from_secs(2))),
            Some(Duration::from_secs(2))
        );

        let bounded = ServerConfig::new().with_max_call_time(Duration::from_secs(5));
        assert_eq!(bounded.effective_timeout(None), Some(Duration::from_secs(5)));
        assert_eq!(
            bounded.effective_timeout(Some(Duration::from_secs(2))),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            bounded.effective_timeout(Some(Duration::from_secs(60))),
            Some(Duration::from_secs(5))
        );
    }
}
