//! Example: registering a custom disposable-mail backend.
//!
//! Any service that can hand out an address and list its messages plugs in
//! through the `MailProvider` and `ProviderFactory` traits. This example wires
//! up an in-memory backend so it runs without network access.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example custom_provider
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use temp_inbox::{
    ClientConfig, MailProvider, ProviderDescriptor, ProviderFactory, ProviderRegistry, RawMessage,
    Reliability, Result, TempInboxClient,
};

/// An in-memory backend that delivers one canned verification email.
struct DemoProvider {
    delivered: bool,
}

#[async_trait]
impl MailProvider for DemoProvider {
    async fn create_inbox(&mut self) -> Result<String> {
        Ok("demo-user@inhouse.test".to_string())
    }

    async fn list_messages(&mut self) -> Result<Vec<RawMessage>> {
        if self.delivered {
            return Ok(Vec::new());
        }
        self.delivered = true;
        Ok(vec![RawMessage {
            id: Some("demo-1".to_string()),
            sender: "noreply@signup.test".to_string(),
            subject: "Confirm your account".to_string(),
            body: "Your verification code is: 628401".to_string(),
        }])
    }
}

struct DemoFactory;

#[async_trait]
impl ProviderFactory for DemoFactory {
    async fn connect(&self) -> Result<Box<dyn MailProvider>> {
        Ok(Box::new(DemoProvider { delivered: false }))
    }
}

#[tokio::main]
async fn main() -> temp_inbox::Result<()> {
    tracing_subscriber::fmt().init();

    let mut registry = ProviderRegistry::new();
    registry.register(ProviderDescriptor {
        name: "inhouse",
        reliability: Reliability::High,
        domains: vec!["inhouse.test".to_string()],
        description: "in-memory demo backend",
        lifetime: None,
        factory: Arc::new(DemoFactory),
    });

    let mut client = TempInboxClient::with_registry(ClientConfig::builder().build()?, registry);

    let address = client.acquire(Some("inhouse.test")).await?;
    println!("Acquired {address}");

    let new_messages = client.check_now().await?;
    println!("Fetched {new_messages} message(s)");

    for message in client.messages().await {
        println!(
            "{} -> code {:?}",
            message.subject, message.verification_code
        );
    }

    client.terminate().await;
    Ok(())
}
