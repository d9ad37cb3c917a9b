//! End-to-end tests driven by scripted in-memory providers.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use temp_inbox::{
    ClientConfig, Error, Event, EventKind, MailProvider, ProviderDescriptor, ProviderFactory,
    ProviderRegistry, RawMessage, Reliability, RetryPolicy, Result, TempInboxClient,
};

/// Serves a fixed sequence of inbox snapshots; the final snapshot repeats.
struct MockInbox {
    address: &'static str,
    batches: Vec<Vec<RawMessage>>,
    cursor: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockInbox {
    fn new(address: &'static str, batches: Vec<Vec<RawMessage>>) -> Arc<Self> {
        Arc::new(Self {
            address,
            batches,
            cursor: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        })
    }

    fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

struct MockProvider {
    inbox: Arc<MockInbox>,
}

#[async_trait]
impl MailProvider for MockProvider {
    async fn create_inbox(&mut self) -> Result<String> {
        Ok(self.inbox.address.to_string())
    }

    async fn list_messages(&mut self) -> Result<Vec<RawMessage>> {
        self.inbox.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.inbox.batches.is_empty() {
            return Ok(Vec::new());
        }
        let idx = self
            .inbox
            .cursor
            .fetch_add(1, Ordering::SeqCst)
            .min(self.inbox.batches.len() - 1);
        Ok(self.inbox.batches[idx].clone())
    }
}

struct MockFactory {
    inbox: Arc<MockInbox>,
}

#[async_trait]
impl ProviderFactory for MockFactory {
    async fn connect(&self) -> Result<Box<dyn MailProvider>> {
        Ok(Box::new(MockProvider {
            inbox: Arc::clone(&self.inbox),
        }))
    }
}

/// Fails its first fetch, then serves a fixed message on every later fetch.
struct FlakyProvider {
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl MailProvider for FlakyProvider {
    async fn create_inbox(&mut self) -> Result<String> {
        Ok("user@flaky.test".to_string())
    }

    async fn list_messages(&mut self) -> Result<Vec<RawMessage>> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(Error::network("connection reset"));
        }
        Ok(vec![message(
            "m1",
            "noreply@service.test",
            "Your verification code is: 918273",
        )])
    }
}

struct FlakyFactory {
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl ProviderFactory for FlakyFactory {
    async fn connect(&self) -> Result<Box<dyn MailProvider>> {
        Ok(Box::new(FlakyProvider {
            fetches: Arc::clone(&self.fetches),
        }))
    }
}

/// Backend without message ids: lists one message, then pushes a second
/// through `wait_for_message`.
struct PushProvider {
    pushed: Arc<AtomicUsize>,
}

#[async_trait]
impl MailProvider for PushProvider {
    async fn create_inbox(&mut self) -> Result<String> {
        Ok("user@push.test".to_string())
    }

    async fn list_messages(&mut self) -> Result<Vec<RawMessage>> {
        Ok(vec![RawMessage {
            id: None,
            sender: "noreply@greeting.test".to_string(),
            subject: "Welcome".to_string(),
            body: "Thanks for joining".to_string(),
        }])
    }

    async fn wait_for_message(&mut self, _timeout: Duration) -> Result<Option<RawMessage>> {
        if self.pushed.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(Some(RawMessage {
                id: None,
                sender: "noreply@signup.test".to_string(),
                subject: "Confirm your account".to_string(),
                body: "Your verification code is: 918273".to_string(),
            }));
        }
        Ok(None)
    }
}

struct PushFactory {
    pushed: Arc<AtomicUsize>,
}

#[async_trait]
impl ProviderFactory for PushFactory {
    async fn connect(&self) -> Result<Box<dyn MailProvider>> {
        Ok(Box::new(PushProvider {
            pushed: Arc::clone(&self.pushed),
        }))
    }
}

/// Always refuses connections.
struct DownFactory;

#[async_trait]
impl ProviderFactory for DownFactory {
    async fn connect(&self) -> Result<Box<dyn MailProvider>> {
        Err(Error::ProviderUnavailable {
            provider: "down".to_string(),
            message: "maintenance".to_string(),
        })
    }
}

fn descriptor(
    name: &'static str,
    reliability: Reliability,
    factory: Arc<dyn ProviderFactory>,
) -> ProviderDescriptor {
    ProviderDescriptor {
        name,
        reliability,
        domains: vec![format!("{name}.test")],
        description: "scripted test backend",
        lifetime: None,
        factory,
    }
}

fn fast_config(session_lifetime: Duration) -> ClientConfig {
    ClientConfig::builder()
        .retry(RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        })
        .poll_interval(Duration::from_millis(30))
        .session_lifetime(session_lifetime)
        .build()
        .expect("valid config")
}

fn message(id: &str, sender: &str, body: &str) -> RawMessage {
    RawMessage {
        id: Some(id.to_string()),
        sender: sender.to_string(),
        subject: "hello".to_string(),
        body: body.to_string(),
    }
}

#[tokio::test]
async fn acquire_fails_over_to_working_provider() {
    let inbox = MockInbox::new("user1@thirdprovider.test", Vec::new());
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor("alpha", Reliability::High, Arc::new(DownFactory)));
    registry.register(descriptor("bravo", Reliability::High, Arc::new(DownFactory)));
    registry.register(descriptor(
        "charlie",
        Reliability::Medium,
        Arc::new(MockFactory {
            inbox: Arc::clone(&inbox),
        }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    let errors = Arc::new(AtomicUsize::new(0));
    let errors_seen = Arc::clone(&errors);
    client.subscribe(EventKind::Error, move |_| {
        errors_seen.fetch_add(1, Ordering::SeqCst);
    });

    let address = client.acquire(None).await.expect("third provider works");
    assert_eq!(address, "user1@thirdprovider.test");
    // One error event per failed provider
    assert_eq!(errors.load(Ordering::SeqCst), 2);

    let info = client.session_info().await.expect("session exists");
    assert_eq!(info.provider_name, "charlie");
    assert!(info.active);
}

#[tokio::test]
async fn acquire_reports_every_attempted_provider() {
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor("alpha", Reliability::High, Arc::new(DownFactory)));
    registry.register(descriptor("bravo", Reliability::Low, Arc::new(DownFactory)));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    let err = client.acquire(None).await.expect_err("all providers down");
    match err {
        Error::AllProvidersFailed { attempted } => {
            assert_eq!(attempted, vec!["alpha", "bravo"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(client.session_info().await.is_none());
}

#[tokio::test]
async fn check_now_counts_only_new_messages() {
    let inbox = MockInbox::new(
        "user@alpha.test",
        vec![
            vec![message("m1", "a@b.test", "plain body")],
            vec![
                message("m1", "a@b.test", "plain body"),
                message("m2", "a@b.test", "another body"),
            ],
            vec![
                message("m1", "a@b.test", "plain body"),
                message("m2", "a@b.test", "another body"),
            ],
        ],
    );
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "alpha",
        Reliability::High,
        Arc::new(MockFactory {
            inbox: Arc::clone(&inbox),
        }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    client.acquire(None).await.unwrap();

    assert_eq!(client.check_now().await.unwrap(), 1);
    assert_eq!(client.check_now().await.unwrap(), 1);
    assert_eq!(client.check_now().await.unwrap(), 0);
    assert_eq!(client.messages().await.len(), 2);
}

#[tokio::test]
async fn poller_deduplicates_and_fires_events_in_order() {
    let inbox = MockInbox::new(
        "user@alpha.test",
        vec![
            vec![message("m1", "a@b.test", "nothing interesting")],
            vec![
                message("m1", "a@b.test", "nothing interesting"),
                message(
                    "m2",
                    "noreply@service.test",
                    "Your verification code is: 403912",
                ),
            ],
        ],
    );
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "alpha",
        Reliability::High,
        Arc::new(MockFactory {
            inbox: Arc::clone(&inbox),
        }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let sink = Arc::clone(&log);
    client.subscribe(EventKind::EmailReceived, move |event| {
        if let Event::EmailReceived(message) = event {
            sink.lock().unwrap().push(format!("email:{}", message.id));
        }
    });
    let sink = Arc::clone(&log);
    client.subscribe(EventKind::VerificationCode, move |event| {
        if let Event::VerificationCode { code, .. } = event {
            sink.lock().unwrap().push(format!("code:{code}"));
        }
    });

    client.acquire(None).await.unwrap();
    client.start_polling();
    assert!(client.is_polling());
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.stop_polling().await;
    assert!(!client.is_polling());

    let log = log.lock().unwrap();
    // Each message surfaces exactly once despite reappearing in later fetches,
    // and the code event follows its email event.
    assert_eq!(
        *log,
        vec!["email:m1", "email:m2", "code:403912"],
        "events: {log:?}"
    );
}

#[tokio::test]
async fn expired_session_fires_one_status_change_and_no_fetch() {
    let inbox = MockInbox::new("user@alpha.test", vec![vec![message("m1", "a", "b")]]);
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "alpha",
        Reliability::High,
        Arc::new(MockFactory {
            inbox: Arc::clone(&inbox),
        }),
    ));

    let mut client = TempInboxClient::with_registry(fast_config(Duration::from_millis(10)), registry);
    let expired_notices = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&expired_notices);
    client.subscribe(EventKind::StatusChange, move |event| {
        if let Event::StatusChange(status) = event {
            if status.contains("expired") {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    client.acquire(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    client.start_polling();
    tokio::time::sleep(Duration::from_millis(150)).await;
    client.stop_polling().await;

    assert_eq!(expired_notices.load(Ordering::SeqCst), 1);
    assert_eq!(inbox.fetch_calls(), 0, "expired sessions are never fetched");

    let info = client.session_info().await.expect("session still inspectable");
    assert!(!info.active);
}

#[tokio::test]
async fn check_now_surfaces_session_errors() {
    let mut client = TempInboxClient::with_registry(
        fast_config(Duration::from_millis(10)),
        ProviderRegistry::new(),
    );
    assert!(matches!(client.check_now().await, Err(Error::NoSession)));

    let inbox = MockInbox::new("user@alpha.test", Vec::new());
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "alpha",
        Reliability::High,
        Arc::new(MockFactory { inbox }),
    ));
    let mut client = TempInboxClient::with_registry(fast_config(Duration::from_millis(10)), registry);
    client.acquire(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(matches!(
        client.check_now().await,
        Err(Error::SessionExpired { .. })
    ));
}

#[tokio::test]
async fn wait_for_code_returns_extracted_code() {
    let inbox = MockInbox::new(
        "user@alpha.test",
        vec![
            Vec::new(),
            Vec::new(),
            vec![message(
                "m1",
                "noreply@service.test",
                "Use code 066533 to continue",
            )],
        ],
    );
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "alpha",
        Reliability::High,
        Arc::new(MockFactory { inbox }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    client.acquire(None).await.unwrap();

    let code = client
        .wait_for_code(Duration::from_secs(2))
        .await
        .expect("session healthy");
    assert_eq!(code.as_deref(), Some("066533"));
}

#[tokio::test]
async fn wait_for_code_times_out_on_empty_inbox() {
    let inbox = MockInbox::new("user@alpha.test", Vec::new());
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "alpha",
        Reliability::High,
        Arc::new(MockFactory { inbox }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    client.acquire(None).await.unwrap();

    let code = client
        .wait_for_code(Duration::from_millis(100))
        .await
        .expect("session healthy");
    assert!(code.is_none());
}

#[tokio::test]
async fn terminate_discards_session() {
    let inbox = MockInbox::new("user@alpha.test", Vec::new());
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "alpha",
        Reliability::High,
        Arc::new(MockFactory { inbox }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    client.acquire(None).await.unwrap();
    assert!(client.current_address().await.is_some());

    client.terminate().await;
    assert!(client.current_address().await.is_none());
    assert!(matches!(client.check_now().await, Err(Error::NoSession)));
}

#[tokio::test]
async fn poller_continues_after_fetch_failure() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "flaky",
        Reliability::High,
        Arc::new(FlakyFactory {
            fetches: Arc::clone(&fetches),
        }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    let errors = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&errors);
    client.subscribe(EventKind::Error, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let received = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&received);
    client.subscribe(EventKind::EmailReceived, move |event| {
        if let Event::EmailReceived(message) = event {
            sink.lock().unwrap().push(message.id.clone());
        }
    });

    client.acquire(None).await.unwrap();
    client.start_polling();
    tokio::time::sleep(Duration::from_millis(300)).await;
    client.stop_polling().await;

    // The failed tick surfaces as an error event, the poller keeps going and
    // delivers the message on a later tick
    assert!(errors.load(Ordering::SeqCst) >= 1);
    assert!(fetches.load(Ordering::SeqCst) >= 2);
    assert!(received.lock().unwrap().contains(&"m1".to_string()));
}

#[tokio::test]
async fn pushed_message_without_id_is_not_dropped() {
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "push",
        Reliability::High,
        Arc::new(PushFactory {
            pushed: Arc::new(AtomicUsize::new(0)),
        }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    client.acquire(None).await.unwrap();

    // The listed id-less message gets a positional id
    assert_eq!(client.check_now().await.unwrap(), 1);

    // The pushed message must not collide with it
    let code = client
        .wait_for_code(Duration::from_secs(2))
        .await
        .expect("session healthy");
    assert_eq!(code.as_deref(), Some("918273"));

    let messages = client.messages().await;
    assert_eq!(messages.len(), 2);
    assert_ne!(messages[0].id, messages[1].id);
}

#[tokio::test]
async fn preferred_domain_steers_acquisition() {
    let alpha = MockInbox::new("user@alpha.test", Vec::new());
    let bravo = MockInbox::new("user@bravo.test", Vec::new());
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "alpha",
        Reliability::High,
        Arc::new(MockFactory { inbox: alpha }),
    ));
    registry.register(descriptor(
        "bravo",
        Reliability::High,
        Arc::new(MockFactory { inbox: bravo }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    let address = client.acquire(Some("bravo.test")).await.unwrap();
    assert_eq!(address, "user@bravo.test");
}

#[tokio::test]
async fn preferred_domain_outranks_reliability_tier() {
    let other = MockInbox::new("user@other.test", Vec::new());
    let wanted = MockInbox::new("user@wanted.test", Vec::new());
    let mut registry = ProviderRegistry::new();
    registry.register(descriptor(
        "other",
        Reliability::High,
        Arc::new(MockFactory { inbox: other }),
    ));
    registry.register(descriptor(
        "wanted",
        Reliability::Medium,
        Arc::new(MockFactory { inbox: wanted }),
    ));

    let mut client =
        TempInboxClient::with_registry(fast_config(Duration::from_secs(3600)), registry);
    // A lower-tier provider serving the requested domain beats a higher-tier
    // provider that cannot serve it
    let address = client.acquire(Some("wanted.test")).await.unwrap();
    assert_eq!(address, "user@wanted.test");
}
