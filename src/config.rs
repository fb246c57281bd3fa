use std::time::Duration;

/// How the resolver re-queries the attestation API while a signature is pending.
///
/// # Examples
///
/// ```rust
/// use permissionless_cctp::PollingConfig;
///
/// let config = PollingConfig::default()
///     .with_max_attempts(20)
///     .with_poll_interval_secs(30);
/// assert_eq!(config.total_timeout_secs(), 600);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Maximum number of attestation queries before giving up.
    pub max_attempts: u32,
    /// Seconds to wait after a query that did not return a signature.
    pub poll_interval_secs: u64,
}

impl Default for PollingConfig {
    /// 30 attempts a minute apart, enough for the 13-19 minutes Circle takes
    /// to attest a standard transfer from Ethereum.
    fn default() -> Self {
        Self {
            max_attempts: 30,
            poll_interval_secs: 60,
        }
    }
}

impl PollingConfig {
    /// 60 attempts five seconds apart, for chains Circle attests in seconds
    /// (Avalanche, the L2 testnets).
    pub fn fast() -> Self {
        Self {
            max_attempts: 60,
            poll_interval_secs: 5,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// `max_attempts * poll_interval_secs`
    pub fn total_timeout_secs(&self) -> u64 {
        self.max_attempts as u64 * self.poll_interval_secs
    }
}

/// Delay between delivery-check passes and the overall deadline for a batch
/// of dispatched messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub poll_delay: Duration,
    pub timeout: Duration,
}

impl Default for DeliveryConfig {
    /// Check every 5 seconds, give up after 20 minutes.
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(20 * 60),
        }
    }
}

impl DeliveryConfig {
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_polling_config() {
        let config = PollingConfig::default();
        assert_eq!(config.max_attempts, 30);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.total_timeout_secs(), 1800);
    }

    #[test]
    fn test_fast_polling_config() {
        let config = PollingConfig::fast();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.total_timeout_secs(), 300);
    }

    #[test]
    fn test_polling_builder_chain() {
        let config = PollingConfig::fast()
            .with_max_attempts(3)
            .with_poll_interval_secs(1);
        assert_eq!(config, PollingConfig { max_attempts: 3, poll_interval_secs: 1 });
    }

    #[test]
    fn test_zero_attempts_has_zero_timeout() {
        assert_eq!(PollingConfig::default().with_max_attempts(0).total_timeout_secs(), 0);
    }

    #[test]
    fn test_default_delivery_config() {
        let config = DeliveryConfig::default();
        assert_eq!(config.poll_delay, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(1200));
    }

    #[test]
    fn test_delivery_config_overrides() {
        let config = DeliveryConfig::default()
            .with_poll_delay(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(1));
        assert_eq!(config.poll_delay, Duration::from_millis(10));
        assert_eq!(config.timeout, Duration::from_secs(1));
    }
}
