//! Client configuration.
//!
//! Use [`ClientConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use temp_inbox::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder()
//!     .poll_interval(Duration::from_secs(5))
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::{Error, Result};
use crate::proxy::Socks5Proxy;
use crate::retry::RetryPolicy;
use std::time::Duration;

/// Configuration for [`TempInboxClient`](crate::TempInboxClient).
///
/// Create using [`ClientConfig::builder()`]. Every field has a working default.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Retry behavior for provider operations.
    pub retry: RetryPolicy,
    /// Polling configuration for the background monitor.
    pub polling: PollingConfig,
    /// How long a session stays valid after acquisition.
    pub session_lifetime: Duration,
    /// How long `stop_polling` waits for the poller task before aborting it.
    pub stop_join_timeout: Duration,
    /// Per-request timeout for provider HTTP calls.
    pub http_timeout: Duration,
    /// Optional SOCKS5 proxy for provider traffic.
    pub proxy: Option<Socks5Proxy>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            polling: PollingConfig::default(),
            session_lifetime: Duration::from_secs(3600),
            stop_join_timeout: Duration::from_secs(2),
            http_timeout: Duration::from_secs(30),
            proxy: None,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Polling configuration for the background monitor.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Interval between inbox checks.
    pub interval: Duration,
    /// Maximum time `wait_for_code` blocks before giving up.
    pub max_wait: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    retry: Option<RetryPolicy>,
    polling: Option<PollingConfig>,
    session_lifetime: Option<Duration>,
    stop_join_timeout: Option<Duration>,
    http_timeout: Option<Duration>,
    proxy: Option<Socks5Proxy>,
}

impl ClientConfigBuilder {
    /// Sets the retry policy for provider operations.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets polling configuration.
    #[must_use]
    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.polling = Some(polling);
        self
    }

    /// Sets the interval between inbox checks.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.polling
            .get_or_insert_with(PollingConfig::default)
            .interval = interval;
        self
    }

    /// Sets the maximum time `wait_for_code` blocks.
    #[must_use]
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.polling
            .get_or_insert_with(PollingConfig::default)
            .max_wait = max_wait;
        self
    }

    /// Sets the session lifetime. Default is one hour.
    #[must_use]
    pub fn session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = Some(lifetime);
        self
    }

    /// Sets how long `stop_polling` waits before aborting the poller task.
    #[must_use]
    pub fn stop_join_timeout(mut self, timeout: Duration) -> Self {
        self.stop_join_timeout = Some(timeout);
        self
    }

    /// Sets the per-request timeout for provider HTTP calls.
    #[must_use]
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets a SOCKS5 proxy for provider traffic.
    #[must_use]
    pub fn proxy(mut self, proxy: Socks5Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a duration field is zero.
    pub fn build(self) -> Result<ClientConfig> {
        let polling = self.polling.unwrap_or_default();
        if polling.interval.is_zero() {
            return Err(Error::InvalidConfig {
                message: "poll interval must be non-zero".into(),
            });
        }

        let session_lifetime = self.session_lifetime.unwrap_or(Duration::from_secs(3600));
        if session_lifetime.is_zero() {
            return Err(Error::InvalidConfig {
                message: "session lifetime must be non-zero".into(),
            });
        }

        Ok(ClientConfig {
            retry: self.retry.unwrap_or_default(),
            polling,
            session_lifetime,
            stop_join_timeout: self.stop_join_timeout.unwrap_or(Duration::from_secs(2)),
            http_timeout: self.http_timeout.unwrap_or(Duration::from_secs(30)),
            proxy: self.proxy,
        })
    }
}
