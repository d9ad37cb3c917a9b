//! Built-in disposable-mail backends.
//!
//! Each backend module exposes a `descriptor()` returning its
//! [`ProviderDescriptor`](crate::ProviderDescriptor) with default HTTP
//! settings, and a `descriptor_with()` taking explicit [`HttpSettings`]
//! (timeout, proxy) derived from the client configuration.

pub mod guerrilla;
pub mod mailtm;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::proxy::Socks5Proxy;
use std::time::Duration;

/// HTTP transport settings shared by the built-in backends.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional SOCKS5 proxy.
    pub proxy: Option<Socks5Proxy>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            proxy: None,
        }
    }
}

impl HttpSettings {
    /// Extracts transport settings from a client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            timeout: config.http_timeout,
            proxy: config.proxy.clone(),
        }
    }

    /// Builds a [`reqwest::Client`] honoring these settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the proxy URL is invalid or the
    /// client cannot be constructed.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(proxy.to_reqwest_proxy()?);
        }
        builder.build().map_err(|e| Error::InvalidConfig {
            message: format!("failed to build HTTP client: {e}"),
        })
    }
}

/// Maps a non-success HTTP status to the right error variant.
///
/// Server-side failures (5xx, 429) surface as [`Error::ProviderUnavailable`];
/// everything else is a generic service error.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode) -> Error {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Error::ProviderUnavailable {
            provider: provider.to_string(),
            message: format!("HTTP {status}"),
        }
    } else {
        Error::service(format!("{provider} returned HTTP {status}"))
    }
}

/// Generates a locally unique mailbox name from the current time.
pub(crate) fn random_local_part() -> String {
    let now = chrono::Utc::now();
    format!(
        "ti{}{:06}",
        now.timestamp(),
        now.timestamp_subsec_micros() % 1_000_000
    )
}
