//! HTTP client settings and retry policy.
//!
//! MAAS answers `503 Service Unavailable` while region controllers are busy,
//! often with a `Retry-After` header. The policy here decides how long the
//! controller waits between attempts; the readers themselves never retry.

use std::time::Duration;

/// Default request timeout in seconds
pub const MAAS_DEFAULT_TIMEOUT: u64 = 30;

/// Default connect timeout in seconds
pub const MAAS_CONNECT_TIMEOUT: u64 = 10;

/// Default maximum number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial retry delay in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Default maximum retry delay in milliseconds
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;

/// Retry policy with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Cap on any single delay, including server supplied `Retry-After`
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: u32,
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            backoff_multiplier: 2,
        }
    }

    /// Create a retry policy with no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            backoff_multiplier: 1,
        }
    }

    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    #[must_use]
    pub const fn with_backoff_multiplier(mut self, multiplier: u32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// `min(initial_delay * multiplier^(attempt - 1), max_delay)`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let multiplier = self.backoff_multiplier.saturating_pow(attempt - 1);
        let delay = self.initial_delay.saturating_mul(multiplier);

        std::cmp::min(delay, self.max_delay)
    }

    /// Delay before retry number `attempt`, honouring a server supplied
    /// `Retry-After` when present. Both are capped at `max_delay`.
    #[must_use]
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) if attempt > 0 => std::cmp::min(hint, self.max_delay),
            _ => self.delay_for_attempt(attempt),
        }
    }

    /// Check if retries are enabled.
    #[must_use]
    pub const fn has_retries(&self) -> bool {
        self.max_retries > 0
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a `Retry-After` header value given in whole seconds.
///
/// HTTP dates are not supported and yield `None`.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connect timeout
    pub connect_timeout: Duration,

    /// Retry policy
    pub retry_policy: RetryPolicy,

    /// Enable response compression
    pub enable_compression: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(MAAS_DEFAULT_TIMEOUT),
            connect_timeout: Duration::from_secs(MAAS_CONNECT_TIMEOUT),
            retry_policy: RetryPolicy::new(),
            enable_compression: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Disable retries.
    #[must_use]
    pub const fn without_retries(mut self) -> Self {
        self.retry_policy = RetryPolicy::no_retry();
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_new() {
        let policy = RetryPolicy::new();
        assert_eq!(policy.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(policy.initial_delay, Duration::from_millis(DEFAULT_RETRY_DELAY_MS));
        assert_eq!(policy.max_delay, Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS));
        assert_eq!(policy.backoff_multiplier, 2);
    }

    #[test]
    fn test_retry_policy_no_retry() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_retries, 0);
        assert!(!policy.has_retries());
    }

    #[test]
    fn test_retry_policy_delay_calculation() {
        let policy = RetryPolicy::new();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(0));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(4000));
        // capped
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(5000));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(5000));
    }

    #[test]
    fn test_retry_after_hint_is_capped() {
        let policy = RetryPolicy::new();
        assert_eq!(
            policy.delay_with_hint(1, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.delay_with_hint(1, Some(Duration::from_secs(60))),
            Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS)
        );
        assert_eq!(policy.delay_with_hint(2, None), Duration::from_millis(1000));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 12 "), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(3))
            .with_retry_policy(RetryPolicy::no_retry())
            .with_compression(false);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.retry_policy.max_retries, 0);
        assert!(!config.enable_compression);
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(MAAS_DEFAULT_TIMEOUT));
        assert!(config.retry_policy.has_retries());
        assert!(ClientConfig::new().without_retries().retry_policy.max_retries == 0);
    }
}
