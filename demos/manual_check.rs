//! Example: manual inbox checks without the background poller.
//!
//! Useful when the caller already has its own scheduling loop, or wants full
//! control over when network traffic happens.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example manual_check
//! ```

use std::time::Duration;
use temp_inbox::{ClientConfig, TempInboxClient};

#[tokio::main]
async fn main() -> temp_inbox::Result<()> {
    tracing_subscriber::fmt().init();

    let config = ClientConfig::builder()
        .session_lifetime(Duration::from_secs(600))
        .http_timeout(Duration::from_secs(15))
        .build()?;
    let mut client = TempInboxClient::with_config(config);

    println!("Known domains: {:?}", client.available_domains());
    println!("Provider stats: {:?}", client.service_stats());

    let address = client.acquire(None).await?;
    println!("Acquired {address}");

    // Check five times, ten seconds apart
    for round in 1..=5 {
        let new_messages = client.check_now().await?;
        println!("check {round}: {new_messages} new message(s)");

        for message in client.messages().await {
            let code = message.verification_code.as_deref().unwrap_or("-");
            println!("  [{}] {} (code: {code})", message.id, message.subject);
        }

        tokio::time::sleep(Duration::from_secs(10)).await;
    }

    if let Some(info) = client.session_info().await {
        println!(
            "Session had {} message(s), expires at {}",
            info.message_count, info.expires_at
        );
    }

    client.terminate().await;
    Ok(())
}
