//! Guerrilla Mail backend.
//!
//! Single-endpoint AJAX API keyed by a session token (`sid_token`) handed out
//! with the address. Message identifiers are numeric in the listing and the
//! excerpt is only a preview, so full bodies come from `fetch_email`.

use super::{status_error, HttpSettings};
use crate::error::{Error, Result};
use crate::provider::{
    MailProvider, ProviderDescriptor, ProviderFactory, RawMessage, Reliability,
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://api.guerrillamail.com/ajax.php";
const PROVIDER_NAME: &str = "guerrillamail";

/// Descriptor for the Guerrilla Mail backend with default HTTP settings.
#[must_use]
pub fn descriptor() -> ProviderDescriptor {
    descriptor_with(HttpSettings::default())
}

/// Descriptor for the Guerrilla Mail backend with explicit HTTP settings.
#[must_use]
pub fn descriptor_with(settings: HttpSettings) -> ProviderDescriptor {
    ProviderDescriptor {
        name: PROVIDER_NAME,
        reliability: Reliability::Medium,
        domains: vec![
            "guerrillamail.com".to_string(),
            "guerrillamail.net".to_string(),
            "sharklasers.com".to_string(),
        ],
        description: "token-keyed AJAX API, addresses last one hour",
        lifetime: Some(std::time::Duration::from_secs(3600)),
        factory: Arc::new(GuerrillaFactory { settings }),
    }
}

struct GuerrillaFactory {
    settings: HttpSettings,
}

#[async_trait]
impl ProviderFactory for GuerrillaFactory {
    async fn connect(&self) -> Result<Box<dyn MailProvider>> {
        let http = self.settings.build_client()?;
        Ok(Box::new(GuerrillaProvider {
            http,
            sid_token: None,
        }))
    }
}

struct GuerrillaProvider {
    http: reqwest::Client,
    sid_token: Option<String>,
}

/// The API serves `mail_id` as either a number or a string.
fn flexible_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("expected string or number")),
    }
}

#[derive(Deserialize)]
struct NewAddress {
    email_addr: String,
    sid_token: String,
}

#[derive(Deserialize)]
struct EmailList {
    #[serde(default)]
    list: Vec<EmailSummary>,
}

#[derive(Deserialize)]
struct EmailSummary {
    #[serde(deserialize_with = "flexible_id", alias = "id")]
    mail_id: String,
    #[serde(default, alias = "from")]
    mail_from: String,
    #[serde(default, alias = "subject")]
    mail_subject: String,
    #[serde(default, alias = "excerpt")]
    mail_excerpt: String,
}

#[derive(Deserialize)]
struct EmailDetail {
    #[serde(default, alias = "body")]
    mail_body: String,
}

impl GuerrillaProvider {
    fn sid(&self) -> Result<&str> {
        self.sid_token.as_deref().ok_or(Error::NoSession)
    }

    async fn fetch_body(&self, mail_id: &str) -> Result<String> {
        let response = self
            .http
            .get(BASE_URL)
            .query(&[
                ("f", "fetch_email"),
                ("email_id", mail_id),
                ("sid_token", self.sid()?),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_NAME, response.status()));
        }
        let detail: EmailDetail = response.json().await?;
        Ok(detail.mail_body)
    }
}

#[async_trait]
impl MailProvider for GuerrillaProvider {
    #[instrument(skip(self))]
    async fn create_inbox(&mut self) -> Result<String> {
        let response = self
            .http
            .get(BASE_URL)
            .query(&[("f", "get_email_address")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_NAME, response.status()));
        }
        let address: NewAddress = response.json().await?;
        self.sid_token = Some(address.sid_token);

        debug!(address = address.email_addr, "Provisioned inbox");
        Ok(address.email_addr)
    }

    #[instrument(skip(self))]
    async fn list_messages(&mut self) -> Result<Vec<RawMessage>> {
        let response = self
            .http
            .get(BASE_URL)
            .query(&[
                ("f", "get_email_list"),
                ("offset", "0"),
                ("sid_token", self.sid()?),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_NAME, response.status()));
        }
        let listing: EmailList = response.json().await?;

        let mut messages = Vec::with_capacity(listing.list.len());
        for summary in listing.list {
            let body = match self.fetch_body(&summary.mail_id).await {
                Ok(body) if !body.trim().is_empty() => body,
                _ => summary.mail_excerpt,
            };
            messages.push(RawMessage {
                id: Some(summary.mail_id),
                sender: summary.mail_from,
                subject: summary.mail_subject,
                body,
            });
        }
        Ok(messages)
    }
}
