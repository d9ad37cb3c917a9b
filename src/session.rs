//! Session state: one disposable address, its messages, its lifetime.

use crate::provider::{MailProvider, RawMessage};
use chrono::{DateTime, Utc};
use email_address::EmailAddress;
use std::fmt;
use std::time::Duration;

/// A message admitted into the session after deduplication.
#[derive(Debug, Clone)]
pub struct Message {
    /// Stable identifier, backend-assigned or synthesized from list position.
    pub id: String,
    /// Sender address or display string.
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// Body, normalized to whatever the backend returned.
    pub body: String,
    /// When the session first saw this message.
    pub received_at: DateTime<Utc>,
    /// Best verification code found in the message, if any passed the gate.
    pub verification_code: Option<String>,
}

impl Message {
    /// Builds a [`Message`] from a backend message, synthesizing a positional
    /// identifier when the backend did not assign one.
    #[must_use]
    pub fn from_raw(raw: RawMessage, position: usize) -> Self {
        Self {
            id: raw.id.unwrap_or_else(|| format!("pos-{position}")),
            sender: raw.sender,
            subject: raw.subject,
            body: raw.body,
            received_at: Utc::now(),
            verification_code: None,
        }
    }
}

/// Read-only snapshot of session state for diagnostics.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// The disposable address.
    pub address: String,
    /// Name of the backend serving it.
    pub provider_name: &'static str,
    /// When the session was acquired.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    /// Messages received so far.
    pub message_count: usize,
    /// Whether the session is still active.
    pub active: bool,
}

/// One live disposable inbox: address, backend connection, received messages.
pub struct Session {
    address: EmailAddress,
    provider_name: &'static str,
    handle: Box<dyn MailProvider>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    messages: Vec<Message>,
    active: bool,
}

impl Session {
    /// Creates a session around a freshly provisioned inbox.
    #[must_use]
    pub fn new(
        address: EmailAddress,
        provider_name: &'static str,
        handle: Box<dyn MailProvider>,
        lifetime: Duration,
    ) -> Self {
        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self {
            address,
            provider_name,
            handle,
            created_at,
            expires_at,
            messages: Vec::new(),
            active: true,
        }
    }

    /// The disposable address.
    #[must_use]
    pub fn address(&self) -> &EmailAddress {
        &self.address
    }

    /// Name of the backend serving this session.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider_name
    }

    /// Mutable access to the backend connection.
    pub fn handle_mut(&mut self) -> &mut dyn MailProvider {
        self.handle.as_mut()
    }

    /// Messages received so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True while the session has not been terminated or expired.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True once the wall clock passes the session's expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Time left before expiry, zero if already expired.
    #[must_use]
    pub fn time_remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether a message with this identifier was already admitted.
    #[must_use]
    pub fn contains_message(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Appends a message unless its identifier was already seen.
    ///
    /// Returns a reference to the stored message when it was genuinely new.
    pub fn push_message(&mut self, message: Message) -> Option<&Message> {
        if self.contains_message(&message.id) {
            return None;
        }
        self.messages.push(message);
        self.messages.last()
    }

    /// Marks the session inactive. Idempotent.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Snapshot for diagnostics.
    #[must_use]
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            address: self.address.to_string(),
            provider_name: self.provider_name,
            created_at: self.created_at,
            expires_at: self.expires_at,
            message_count: self.messages.len(),
            active: self.active,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("provider_name", &self.provider_name)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("message_count", &self.messages.len())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
