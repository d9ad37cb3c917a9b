//! Error types for the temp-inbox crate.
//!
//! All errors implement [`std::error::Error`] and provide context about what went wrong.
//! Every error maps onto the small [`FailureKind`] taxonomy via [`Error::kind`] — nothing
//! reaching a caller is an uncategorized raw failure — and retryability is exposed through
//! [`Error::is_retryable`].

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during temporary inbox operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / validation errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Provider returned an address that is not a usable email address.
    #[error("provider '{provider}' returned invalid address: {address:?}")]
    InvalidAddress {
        /// The provider that produced the address.
        provider: String,
        /// The rejected address.
        address: String,
    },

    /// An operation that requires a live session was called without one.
    #[error("no active email session")]
    NoSession,

    // ─────────────────────────────────────────────────────────────────────────
    // Network errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// Transport-level failure talking to a provider.
    #[error("network error: {context}")]
    Network {
        /// What was being attempted.
        context: String,
        /// The underlying transport error, when available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Availability errors (terminal for the call)
    // ─────────────────────────────────────────────────────────────────────────
    /// A single provider is explicitly down or refused service.
    #[error("provider '{provider}' unavailable: {message}")]
    ProviderUnavailable {
        /// The provider name.
        provider: String,
        /// Human-readable reason.
        message: String,
    },

    /// Every candidate provider was tried and none produced a working inbox.
    #[error("all {} temporary email providers failed ({attempted:?}); try again later", .attempted.len())]
    AllProvidersFailed {
        /// Names of the providers attempted, in order.
        attempted: Vec<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Session lifecycle errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The session's provider-defined lifetime has elapsed.
    #[error("email session for {address} has expired")]
    SessionExpired {
        /// The expired inbox address.
        address: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Everything else (RETRYABLE, classified generic at the boundary)
    // ─────────────────────────────────────────────────────────────────────────
    /// Unclassified provider or application failure.
    #[error("service error: {context}")]
    Service {
        /// What was being attempted.
        context: String,
        /// The underlying error, when available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a network error with context only.
    #[must_use]
    pub fn network(context: impl Into<String>) -> Self {
        Error::Network {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a network error with an underlying source.
    pub fn network_with(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Network {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a generic service error with context only.
    #[must_use]
    pub fn service(context: impl Into<String>) -> Self {
        Error::Service {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a generic service error with an underlying source.
    pub fn service_with(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Service {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` if this error represents a transient failure that might succeed on retry.
    ///
    /// Transport failures and unclassified provider failures are retryable; configuration
    /// problems, missing sessions, exhausted providers, and expired sessions are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network { .. } | Error::Service { .. } => true,

            Error::InvalidConfig { .. }
            | Error::InvalidAddress { .. }
            | Error::NoSession
            | Error::ProviderUnavailable { .. }
            | Error::AllProvidersFailed { .. }
            | Error::SessionExpired { .. } => false,
        }
    }

    /// Classifies this error into the boundary [`FailureKind`] taxonomy.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Network { .. } => FailureKind::NetworkError,

            Error::ProviderUnavailable { .. } | Error::AllProvidersFailed { .. } => {
                FailureKind::ServiceUnavailable
            }

            Error::SessionExpired { .. } => FailureKind::SessionExpired,

            Error::InvalidConfig { .. }
            | Error::InvalidAddress { .. }
            | Error::NoSession
            | Error::Service { .. } => FailureKind::GenericServiceError,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        let context = source
            .url()
            .map_or_else(|| "provider request failed".to_string(), |u| format!("request to {u} failed"));

        if source.is_connect() || source.is_timeout() || source.is_request() {
            Error::Network {
                context,
                source: Some(Box::new(source)),
            }
        } else {
            Error::Service {
                context,
                source: Some(Box::new(source)),
            }
        }
    }
}

/// Coarse failure taxonomy surfaced at the session-manager boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Transport failure, retryable.
    NetworkError,
    /// All providers exhausted or a provider explicitly down.
    ServiceUnavailable,
    /// Passive, time-based session expiry.
    SessionExpired,
    /// Unclassified provider/application failure.
    GenericServiceError,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::NetworkError => write!(f, "network_error"),
            FailureKind::ServiceUnavailable => write!(f, "service_unavailable"),
            FailureKind::SessionExpired => write!(f, "session_expired"),
            FailureKind::GenericServiceError => write!(f, "generic_service_error"),
        }
    }
}
