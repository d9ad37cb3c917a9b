//! The provider seam: how backends plug into the client.
//!
//! A backend contributes a [`ProviderDescriptor`] (static metadata plus a
//! [`ProviderFactory`]) to the registry. When a session is acquired the factory
//! produces a live [`MailProvider`] connection owning whatever per-session state
//! the backend needs (API tokens, assigned mailbox identifiers).

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Reliability tier used to order providers during acquisition.
///
/// Within a tier the registry preserves registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reliability {
    /// Preferred providers tried first.
    High,
    /// Fallback providers.
    Medium,
    /// Last-resort providers.
    Low,
}

impl Reliability {
    /// Ordering rank, lower is tried earlier.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Reliability::High => 0,
            Reliability::Medium => 1,
            Reliability::Low => 2,
        }
    }
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Reliability::High => "high",
            Reliability::Medium => "medium",
            Reliability::Low => "low",
        };
        f.write_str(label)
    }
}

/// A message as returned by a backend, before session bookkeeping.
///
/// Backends that cannot supply a stable identifier leave `id` unset; the
/// session layer synthesizes a positional one.
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    /// Backend-assigned message identifier, if any.
    pub id: Option<String>,
    /// Sender address or display string.
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// Message body, plain text or HTML.
    pub body: String,
}

/// A live connection to one disposable-mail backend.
///
/// Implementations own their per-session state and are driven from a single
/// task at a time; the client serializes access.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Provisions a fresh inbox and returns its address.
    async fn create_inbox(&mut self) -> Result<String>;

    /// Fetches the full current message list for the inbox.
    ///
    /// Implementations return every visible message; deduplication happens in
    /// the session layer.
    async fn list_messages(&mut self) -> Result<Vec<RawMessage>>;

    /// Blocks until a new message arrives or the timeout elapses.
    ///
    /// Backends with a long-poll or push API override this; the default
    /// returns `None` immediately so the client falls back to interval polling.
    async fn wait_for_message(&mut self, timeout: Duration) -> Result<Option<RawMessage>> {
        let _ = timeout;
        Ok(None)
    }
}

/// Produces live [`MailProvider`] connections.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Opens a connection to the backend.
    async fn connect(&self) -> Result<Box<dyn MailProvider>>;
}

/// Static metadata and factory for one registered backend.
#[derive(Clone)]
pub struct ProviderDescriptor {
    /// Short unique name, e.g. `"mail.tm"`.
    pub name: &'static str,
    /// Ordering tier during acquisition.
    pub reliability: Reliability,
    /// Domains this backend can hand out addresses under.
    pub domains: Vec<String>,
    /// One-line description for diagnostics.
    pub description: &'static str,
    /// Backend-imposed inbox lifetime, if shorter than the configured default.
    pub lifetime: Option<Duration>,
    /// Connection factory.
    pub factory: Arc<dyn ProviderFactory>,
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("reliability", &self.reliability)
            .field("domains", &self.domains)
            .field("description", &self.description)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliability_ordering() {
        assert!(Reliability::High.rank() < Reliability::Medium.rank());
        assert!(Reliability::Medium.rank() < Reliability::Low.rank());
        assert_eq!(Reliability::High.to_string(), "high");
    }

    #[test]
    fn test_raw_message_defaults() {
        let msg = RawMessage::default();
        assert!(msg.id.is_none());
        assert!(msg.sender.is_empty());
    }
}
