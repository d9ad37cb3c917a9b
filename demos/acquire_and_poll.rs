//! Basic example: acquire a disposable inbox and wait for a verification code.
//!
//! This example demonstrates the most common use case - acquiring a throwaway
//! address with automatic provider failover, then polling until a verification
//! code arrives.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example acquire_and_poll
//! ```
//!
//! Use the printed address to sign up somewhere, then watch the code arrive.

use std::time::Duration;
use temp_inbox::{Event, EventKind, TempInboxClient};

#[tokio::main]
async fn main() -> temp_inbox::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "temp_inbox=info".into()),
        )
        .init();

    let mut client = TempInboxClient::new()?;

    // React to inbox activity as it happens
    client.subscribe(EventKind::EmailReceived, |event| {
        if let Event::EmailReceived(message) = event {
            println!("new mail from {}: {}", message.sender, message.subject);
        }
    });
    client.subscribe(EventKind::StatusChange, |event| {
        if let Event::StatusChange(status) = event {
            println!("[status] {status}");
        }
    });

    let address = client.acquire(None).await?;
    println!("Disposable address ready: {address}");
    println!("Send a verification email to it now (waiting up to 2 minutes)...");

    client.start_polling();
    match client.wait_for_code(Duration::from_secs(120)).await? {
        Some(code) => println!("Got verification code: {code}"),
        None => println!("No code arrived in time"),
    }

    client.stop_polling().await;
    client.terminate().await;
    Ok(())
}
