//! The disposable-inbox client: acquisition, polling, events.
//!
//! [`TempInboxClient`] ties the registry, retry policy, extraction engine and
//! event dispatcher together around one session at a time. Acquisition walks
//! providers in reliability order with per-provider retries; the background
//! poller fetches the inbox on an interval, deduplicates, extracts codes and
//! fires events.
//!
//! # Example
//!
//! ```no_run
//! use temp_inbox::{Event, EventKind, TempInboxClient};
//! use std::time::Duration;
//!
//! # async fn run() -> temp_inbox::Result<()> {
//! let mut client = TempInboxClient::new()?;
//! client.subscribe(EventKind::VerificationCode, |event| {
//!     if let Event::VerificationCode { code, .. } = event {
//!         println!("got code {code}");
//!     }
//! });
//!
//! let address = client.acquire(None).await?;
//! println!("inbox ready: {address}");
//!
//! client.start_polling();
//! let code = client.wait_for_code(Duration::from_secs(120)).await?;
//! client.stop_polling().await;
//! # Ok(())
//! # }
//! ```

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::events::{Event, EventDispatcher, EventKind};
use crate::extractor::CodeExtractor;
use crate::provider::ProviderDescriptor;
use crate::providers::HttpSettings;
use crate::registry::{ProviderRegistry, ServiceStats};
use crate::retry::RetryPolicy;
use crate::session::{Message, Session, SessionInfo};
use email_address::EmailAddress;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

type SharedSession = Arc<Mutex<Option<Session>>>;

struct PollerHandle {
    stop: Arc<AtomicBool>,
    notify: Arc<Notify>,
    task: JoinHandle<()>,
}

/// High-level client managing one disposable inbox at a time.
pub struct TempInboxClient {
    config: ClientConfig,
    registry: ProviderRegistry,
    session: SharedSession,
    dispatcher: Arc<EventDispatcher>,
    extractor: CodeExtractor,
    poller: Option<PollerHandle>,
}

impl TempInboxClient {
    /// Creates a client with default configuration and the built-in providers.
    ///
    /// # Errors
    ///
    /// Returns an error when the default configuration cannot be built.
    pub fn new() -> Result<Self> {
        Ok(Self::with_config(ClientConfig::builder().build()?))
    }

    /// Creates a client with explicit configuration and the built-in providers.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let registry = ProviderRegistry::with_defaults_for(&HttpSettings::from_config(&config));
        Self::with_registry(config, registry)
    }

    /// Creates a client with explicit configuration and provider registry.
    #[must_use]
    pub fn with_registry(config: ClientConfig, registry: ProviderRegistry) -> Self {
        Self {
            config,
            registry,
            session: Arc::new(Mutex::new(None)),
            dispatcher: Arc::new(EventDispatcher::new()),
            extractor: CodeExtractor::new(),
            poller: None,
        }
    }

    /// Registers an event callback. Register before starting the poller.
    pub fn subscribe(&self, kind: EventKind, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.dispatcher.subscribe(kind, callback);
    }

    /// Acquires a fresh disposable inbox, replacing any existing session.
    ///
    /// Providers are tried in reliability order; when `preferred_domain` is
    /// given, every provider serving it is tried before any that cannot,
    /// regardless of tier. Each provider gets the configured retry budget
    /// before the next one is tried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllProvidersFailed`] when every registered provider
    /// was exhausted.
    #[instrument(skip(self))]
    pub async fn acquire(&mut self, preferred_domain: Option<&str>) -> Result<String> {
        self.dispatcher
            .fire(&Event::StatusChange("acquiring inbox".to_string()));

        let ordered = self.registry.ordered_for(preferred_domain);
        let mut attempted = Vec::with_capacity(ordered.len());

        for descriptor in &ordered {
            attempted.push(descriptor.name.to_string());
            match self.try_provider(descriptor).await {
                Ok(address) => {
                    info!(provider = descriptor.name, address, "Acquired inbox");
                    self.dispatcher.fire(&Event::StatusChange(format!(
                        "acquired {address} via {}",
                        descriptor.name
                    )));
                    return Ok(address);
                }
                Err(err) => {
                    warn!(provider = descriptor.name, error = %err, "Provider failed, trying next");
                    self.dispatcher
                        .fire(&Event::Error(format!("{}: {err}", descriptor.name)));
                }
            }
        }

        Err(Error::AllProvidersFailed { attempted })
    }

    async fn try_provider(&mut self, descriptor: &ProviderDescriptor) -> Result<String> {
        let factory = Arc::clone(&descriptor.factory);
        let (handle, address) = self
            .config
            .retry
            .run(|| {
                let factory = Arc::clone(&factory);
                async move {
                    let mut handle = factory.connect().await?;
                    let address = handle.create_inbox().await?;
                    Ok((handle, address))
                }
            })
            .await?;

        let parsed = validate_address(descriptor.name, &address)?;

        let lifetime = descriptor
            .lifetime
            .map_or(self.config.session_lifetime, |provider_limit| {
                provider_limit.min(self.config.session_lifetime)
            });

        let mut guard = self.session.lock().await;
        if let Some(old) = guard.as_mut() {
            old.deactivate();
        }
        *guard = Some(Session::new(parsed, descriptor.name, handle, lifetime));
        Ok(address)
    }

    /// Starts the background poller. No-op when it is already running.
    pub fn start_polling(&mut self) {
        if let Some(handle) = &self.poller {
            if !handle.task.is_finished() {
                debug!("Poller already running");
                return;
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.session),
            Arc::clone(&self.dispatcher),
            self.extractor,
            self.tick_retry(),
            self.config.polling.interval,
            Arc::clone(&stop),
            Arc::clone(&notify),
        ));
        self.poller = Some(PollerHandle { stop, notify, task });
        self.dispatcher
            .fire(&Event::StatusChange("polling started".to_string()));
    }

    /// True while the background poller task is alive.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Stops the background poller, waiting a bounded time for it to finish.
    ///
    /// The poller is aborted if it does not exit within the configured join
    /// timeout.
    pub async fn stop_polling(&mut self) {
        let Some(handle) = self.poller.take() else {
            return;
        };
        handle.stop.store(true, Ordering::SeqCst);
        handle.notify.notify_waiters();

        let abort = handle.task.abort_handle();
        if tokio::time::timeout(self.config.stop_join_timeout, handle.task)
            .await
            .is_err()
        {
            warn!("Poller did not stop in time, aborting");
            abort.abort();
        }
        self.dispatcher
            .fire(&Event::StatusChange("polling stopped".to_string()));
    }

    /// Checks the inbox once, immediately, and returns how many genuinely new
    /// messages were admitted. Events fire exactly as they would from the
    /// background poller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] without a session, [`Error::SessionExpired`]
    /// when the session has lapsed, or the underlying fetch error after the
    /// retry budget is spent.
    #[instrument(skip(self))]
    pub async fn check_now(&mut self) -> Result<usize> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(Error::NoSession)?;

        if !session.is_active() || session.is_expired() {
            let address = session.address().to_string();
            session.deactivate();
            return Err(Error::SessionExpired { address });
        }

        let raws = fetch_with_retry(session, &self.tick_retry()).await?;
        Ok(ingest(session, raws, 0, self.extractor, &self.dispatcher))
    }

    /// Blocks until a verification code is available or the timeout elapses.
    ///
    /// Codes already extracted from earlier messages are returned immediately.
    /// Backends with a long-poll API are used when they support it; otherwise
    /// the inbox is fetched on the polling interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] without a session or
    /// [`Error::SessionExpired`] when the session lapses while waiting.
    #[instrument(skip(self))]
    pub async fn wait_for_code(&mut self, timeout: Duration) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + timeout;
        let interval = self.config.polling.interval;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            {
                let mut guard = self.session.lock().await;
                let session = guard.as_mut().ok_or(Error::NoSession)?;

                if !session.is_active() || session.is_expired() {
                    let address = session.address().to_string();
                    session.deactivate();
                    return Err(Error::SessionExpired { address });
                }

                if let Some(code) = latest_code(session) {
                    return Ok(Some(code));
                }
                if remaining.is_zero() {
                    return Ok(None);
                }

                let step = remaining.min(interval);
                match session.handle_mut().wait_for_message(step).await? {
                    Some(raw) => {
                        // A pushed message has no listing position; continue
                        // past the ids already synthesized for this session.
                        let base = session.messages().len();
                        ingest(session, vec![raw], base, self.extractor, &self.dispatcher);
                    }
                    None => {
                        let raws = fetch_with_retry(session, &self.tick_retry()).await?;
                        ingest(session, raws, 0, self.extractor, &self.dispatcher);
                    }
                }

                if let Some(code) = latest_code(session) {
                    return Ok(Some(code));
                }
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            tokio::time::sleep(remaining.min(interval)).await;
        }
    }

    /// Snapshot of the current session, if any.
    pub async fn session_info(&self) -> Option<SessionInfo> {
        self.session.lock().await.as_ref().map(Session::info)
    }

    /// The current disposable address, if a session exists.
    pub async fn current_address(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.address().to_string())
    }

    /// Every message received in the current session, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.messages().to_vec())
            .unwrap_or_default()
    }

    /// Every domain the registered providers can serve.
    #[must_use]
    pub fn available_domains(&self) -> Vec<String> {
        self.registry.domains()
    }

    /// Aggregate statistics about the registered providers.
    #[must_use]
    pub fn service_stats(&self) -> ServiceStats {
        self.registry.stats()
    }

    /// Retry policy for fetches that hold the session lock: same budget as the
    /// configured policy, but no single backoff sleep exceeds the poll interval.
    fn tick_retry(&self) -> RetryPolicy {
        self.config.retry.with_delay_cap(self.config.polling.interval)
    }

    /// Stops polling and discards the current session.
    pub async fn terminate(&mut self) {
        self.stop_polling().await;
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            session.deactivate();
            self.dispatcher.fire(&Event::StatusChange(format!(
                "session terminated for {}",
                session.address()
            )));
        }
        *guard = None;
    }
}

/// Rejects addresses a provider hands back that are not plausibly deliverable.
fn validate_address(provider: &str, address: &str) -> Result<EmailAddress> {
    let mut parts = address.split('@');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    );
    if !valid {
        return Err(Error::InvalidAddress {
            provider: provider.to_string(),
            address: address.to_string(),
        });
    }
    EmailAddress::from_str(address).map_err(|_| Error::InvalidAddress {
        provider: provider.to_string(),
        address: address.to_string(),
    })
}

/// Most recent extracted code in the session, if any.
fn latest_code(session: &Session) -> Option<String> {
    session
        .messages()
        .iter()
        .rev()
        .find_map(|m| m.verification_code.clone())
}

/// Fetches the message list, retrying transient failures per the policy.
async fn fetch_with_retry(
    session: &mut Session,
    retry: &RetryPolicy,
) -> Result<Vec<crate::provider::RawMessage>> {
    let mut attempt = 0;
    loop {
        match session.handle_mut().list_messages().await {
            Ok(messages) => return Ok(messages),
            Err(err) => match retry.next_delay(&err, attempt) {
                Some(delay) => {
                    warn!(attempt, error = %err, delay_secs = delay.as_secs(), "Fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(err),
            },
        }
    }
}

/// Admits fetched messages into the session, firing events for new ones.
///
/// `position_base` offsets the synthesized ids for id-less messages: full
/// listings start at 0 (listing positions are stable for append-only inboxes),
/// pushed single messages start past the ids the session already holds.
///
/// Returns the number of genuinely new messages.
fn ingest(
    session: &mut Session,
    raws: Vec<crate::provider::RawMessage>,
    position_base: usize,
    extractor: CodeExtractor,
    dispatcher: &EventDispatcher,
) -> usize {
    let mut new_count = 0;
    for (position, raw) in raws.into_iter().enumerate() {
        let mut message = Message::from_raw(raw, position_base + position);
        if session.contains_message(&message.id) {
            continue;
        }
        message.verification_code = extractor.best_code(&message.body, &message.sender);

        if let Some(stored) = session.push_message(message) {
            let stored = stored.clone();
            new_count += 1;
            debug!(id = stored.id, sender = stored.sender, "New message");
            dispatcher.fire(&Event::EmailReceived(stored.clone()));
            if let Some(code) = stored.verification_code.clone() {
                dispatcher.fire(&Event::VerificationCode {
                    code,
                    message: stored,
                });
            }
        }
    }
    new_count
}

/// Background polling loop. Exits when stopped or when the session expires.
async fn poll_loop(
    session: SharedSession,
    dispatcher: Arc<EventDispatcher>,
    extractor: CodeExtractor,
    retry: RetryPolicy,
    interval: Duration,
    stop: Arc<AtomicBool>,
    notify: Arc<Notify>,
) {
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        let mut failed = false;
        {
            let mut guard = session.lock().await;
            match guard.as_mut() {
                None => {}
                Some(sess) if !sess.is_active() => {}
                Some(sess) if sess.is_expired() => {
                    // Deactivate before firing so this only ever happens once.
                    sess.deactivate();
                    dispatcher.fire(&Event::StatusChange(format!(
                        "session expired for {}",
                        sess.address()
                    )));
                    break;
                }
                Some(sess) => match fetch_with_retry(sess, &retry).await {
                    Ok(raws) => {
                        ingest(sess, raws, 0, extractor, &dispatcher);
                    }
                    Err(err) => {
                        warn!(error = %err, "Inbox fetch failed");
                        dispatcher.fire(&Event::Error(err.to_string()));
                        failed = true;
                    }
                },
            }
        }

        // Back off harder after a terminal fetch failure.
        let pause = if failed { interval * 2 } else { interval };
        tokio::select! {
            () = notify.notified() => {}
            () = tokio::time::sleep(pause) => {}
        }
    }
    debug!("Poller exited");
}
