//! Mail.tm backend.
//!
//! REST API with bearer-token auth: register an account under one of the
//! advertised domains, exchange credentials for a JWT, then poll `/messages`.
//! Message listings only carry a preview, so each new message is fetched
//! individually for its full body.

use super::{random_local_part, status_error, HttpSettings};
use crate::error::{Error, Result};
use crate::provider::{
    MailProvider, ProviderDescriptor, ProviderFactory, RawMessage, Reliability,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://api.mail.tm";
const PROVIDER_NAME: &str = "mail.tm";

/// Descriptor for the Mail.tm backend with default HTTP settings.
#[must_use]
pub fn descriptor() -> ProviderDescriptor {
    descriptor_with(HttpSettings::default())
}

/// Descriptor for the Mail.tm backend with explicit HTTP settings.
#[must_use]
pub fn descriptor_with(settings: HttpSettings) -> ProviderDescriptor {
    ProviderDescriptor {
        name: PROVIDER_NAME,
        reliability: Reliability::High,
        // Domains rotate server-side; this is the long-lived default.
        domains: vec!["mail.tm".to_string()],
        description: "REST API with token auth and stable message identifiers",
        lifetime: None,
        factory: Arc::new(MailTmFactory { settings }),
    }
}

struct MailTmFactory {
    settings: HttpSettings,
}

#[async_trait]
impl ProviderFactory for MailTmFactory {
    async fn connect(&self) -> Result<Box<dyn MailProvider>> {
        let http = self.settings.build_client()?;
        Ok(Box::new(MailTmProvider {
            http,
            token: None,
        }))
    }
}

/// Live Mail.tm connection. Holds the bearer token once an inbox exists.
struct MailTmProvider {
    http: reqwest::Client,
    token: Option<String>,
}

#[derive(Deserialize)]
struct DomainPage {
    #[serde(rename = "hydra:member")]
    member: Vec<DomainEntry>,
}

#[derive(Deserialize)]
struct DomainEntry {
    domain: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct MessagePage {
    #[serde(rename = "hydra:member")]
    member: Vec<MessageSummary>,
}

#[derive(Deserialize)]
struct MessageSummary {
    #[serde(alias = "mail_id")]
    id: String,
    #[serde(default, alias = "sender")]
    from: Option<AddressEntry>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    intro: String,
}

#[derive(Deserialize)]
struct AddressEntry {
    #[serde(default)]
    address: String,
}

#[derive(Deserialize)]
struct MessageDetail {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    html: Option<Vec<String>>,
}

impl MailTmProvider {
    fn bearer(&self) -> Result<&str> {
        self.token.as_deref().ok_or(Error::NoSession)
    }

    async fn first_domain(&self) -> Result<String> {
        let response = self
            .http
            .get(format!("{BASE_URL}/domains"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_NAME, response.status()));
        }
        let page: DomainPage = response.json().await?;
        page.member
            .into_iter()
            .map(|entry| entry.domain)
            .next()
            .ok_or_else(|| Error::ProviderUnavailable {
                provider: PROVIDER_NAME.to_string(),
                message: "no domains advertised".to_string(),
            })
    }

    async fn fetch_body(&self, id: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{BASE_URL}/messages/{id}"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_NAME, response.status()));
        }
        let detail: MessageDetail = response.json().await?;
        if let Some(text) = detail.text {
            if !text.trim().is_empty() {
                return Ok(text);
            }
        }
        Ok(detail.html.unwrap_or_default().join("\n"))
    }
}

#[async_trait]
impl MailProvider for MailTmProvider {
    #[instrument(skip(self))]
    async fn create_inbox(&mut self) -> Result<String> {
        let domain = self.first_domain().await?;
        let address = format!("{}@{domain}", random_local_part());
        let password = random_local_part();

        let response = self
            .http
            .post(format!("{BASE_URL}/accounts"))
            .json(&serde_json::json!({ "address": address, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_NAME, response.status()));
        }

        let response = self
            .http
            .post(format!("{BASE_URL}/token"))
            .json(&serde_json::json!({ "address": address, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_NAME, response.status()));
        }
        let token: TokenResponse = response.json().await?;
        self.token = Some(token.token);

        debug!(address, "Provisioned inbox");
        Ok(address)
    }

    #[instrument(skip(self))]
    async fn list_messages(&mut self) -> Result<Vec<RawMessage>> {
        let response = self
            .http
            .get(format!("{BASE_URL}/messages"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired {
                address: String::new(),
            });
        }
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_NAME, response.status()));
        }
        let page: MessagePage = response.json().await?;

        let mut messages = Vec::with_capacity(page.member.len());
        for summary in page.member {
            let body = match self.fetch_body(&summary.id).await {
                Ok(body) if !body.trim().is_empty() => body,
                // Preview is better than nothing when the detail fetch fails.
                _ => summary.intro,
            };
            messages.push(RawMessage {
                id: Some(summary.id),
                sender: summary.from.map(|f| f.address).unwrap_or_default(),
                subject: summary.subject,
                body,
            });
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_shape() {
        let desc = descriptor();
        assert_eq!(desc.name, "mail.tm");
        assert_eq!(desc.reliability, Reliability::High);
        assert!(!desc.domains.is_empty());
    }

    #[test]
    fn test_message_summary_field_aliases() {
        let summary: MessageSummary = serde_json::from_str(
            r#"{"mail_id": "abc123", "sender": {"address": "noreply@example.com"}, "subject": "Hi"}"#,
        )
        .unwrap();
        assert_eq!(summary.id, "abc123");
        assert_eq!(summary.from.unwrap().address, "noreply@example.com");
        assert_eq!(summary.intro, "");
    }

    #[test]
    fn test_domain_page_parsing() {
        let page: DomainPage = serde_json::from_str(
            r#"{"hydra:member": [{"domain": "mail.tm"}, {"domain": "other.tld"}]}"#,
        )
        .unwrap();
        assert_eq!(page.member.len(), 2);
        assert_eq!(page.member[0].domain, "mail.tm");
    }
}
