//! # temp-inbox
//!
//! Async disposable-email client for receiving verification codes during
//! automated signups.
//!
//! This crate provides a high-level, async API for:
//! - Acquiring throwaway inboxes from public disposable-mail services, with
//!   automatic failover across providers
//! - Polling the inbox in the background with retry and exponential backoff
//! - Extracting verification codes from message bodies with confidence scoring
//! - Reacting to inbox activity through registered event callbacks
//!
//! ## Quick Start
//!
//! ```no_run
//! use temp_inbox::{Event, EventKind, TempInboxClient};
//! use std::time::Duration;
//!
//! # async fn example() -> temp_inbox::Result<()> {
//! let mut client = TempInboxClient::new()?;
//!
//! client.subscribe(EventKind::VerificationCode, |event| {
//!     if let Event::VerificationCode { code, message } = event {
//!         println!("code {code} from {}", message.sender);
//!     }
//! });
//!
//! // Try providers in reliability order until one hands out an address
//! let address = client.acquire(None).await?;
//! println!("use this address: {address}");
//!
//! client.start_polling();
//! if let Some(code) = client.wait_for_code(Duration::from_secs(120)).await? {
//!     println!("verification code: {code}");
//! }
//! client.stop_polling().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Standalone Code Extraction
//!
//! The extraction engine works on any text, without a session:
//!
//! ```
//! use temp_inbox::CodeExtractor;
//!
//! let extractor = CodeExtractor::new();
//! let code = extractor.best_code("Your verification code is: 403912", "noreply@github.com");
//! assert_eq!(code.as_deref(), Some("403912"));
//! ```
//!
//! ## Custom Providers
//!
//! Any backend implementing [`MailProvider`] plus a [`ProviderFactory`] can be
//! registered alongside the built-ins:
//!
//! ```no_run
//! use temp_inbox::{ClientConfig, ProviderRegistry, TempInboxClient};
//!
//! # fn descriptor() -> temp_inbox::ProviderDescriptor { unimplemented!() }
//! # fn example() -> temp_inbox::Result<()> {
//! let mut registry = ProviderRegistry::with_defaults();
//! registry.register(descriptor());
//!
//! let client = TempInboxClient::with_registry(ClientConfig::builder().build()?, registry);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error`. Use [`Error::is_retryable`] to
//! decide whether an operation is worth retrying, or [`Error::kind`] for
//! coarse-grained classification:
//!
//! ```
//! use temp_inbox::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.is_retryable() {
//!         println!("transient, will retry: {error}");
//!     } else {
//!         println!("permanent ({}): {error}", error.kind());
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. Acquisition, polling and
//! provider calls emit spans and structured events; attach any
//! `tracing-subscriber` to collect them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod events;
pub mod extractor;
pub mod html;
pub mod provider;
pub mod providers;
pub mod proxy;
pub mod registry;
pub mod retry;

// Internal modules
mod client;
mod patterns;
mod session;

// Re-exports for ergonomic API
pub use client::TempInboxClient;
pub use config::{ClientConfig, ClientConfigBuilder, PollingConfig};
pub use email_address::EmailAddress;
pub use error::{Error, FailureKind, Result};
pub use events::{Event, EventDispatcher, EventKind};
pub use extractor::{CodeExtractor, VerificationMatch};
pub use provider::{
    MailProvider, ProviderDescriptor, ProviderFactory, RawMessage, Reliability,
};
pub use registry::{ProviderRegistry, ServiceStats};
pub use retry::RetryPolicy;
pub use session::{Message, SessionInfo};
pub use proxy::{ProxyAuth, Socks5Proxy};
