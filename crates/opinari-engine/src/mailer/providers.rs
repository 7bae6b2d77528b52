// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP email transport providers.
//!
//! All providers POST to the configured `EMAIL_API_URL` with a bounded
//! timeout. The hosted providers (SendGrid, Mailgun, Postmark) honor the
//! sandbox recipient override; the local relay does not.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::Config;

use super::traits::{Mailer, MailerError, Result};

/// Build the transport client with the configured send timeout.
fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Map a provider response to success or [`MailerError::Api`].
async fn check_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(MailerError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Redirect the recipient to the sandbox address when one is configured.
fn apply_sandbox<'a>(provider: &str, sandbox: Option<&'a str>, recipient: &'a str) -> &'a str {
    match sandbox {
        Some(address) => {
            info!(
                provider,
                original = %recipient,
                sandbox = %address,
                "Sandbox mode active, overriding recipient"
            );
            address
        }
        None => recipient,
    }
}

/// Select and configure the email transport for the configured provider.
///
/// Unknown provider names fall back to the local relay.
pub fn from_config(config: &Config) -> Result<Arc<dyn Mailer>> {
    let mailer: Arc<dyn Mailer> = match config.email_provider.to_lowercase().as_str() {
        "sendgrid" => Arc::new(SendGridMailer::new(config)?),
        "mailgun" => Arc::new(MailgunMailer::new(config)?),
        "postmark" => Arc::new(PostmarkMailer::new(config)?),
        _ => Arc::new(LocalMailer::new(config)?),
    };
    info!(provider = mailer.provider_name(), "Email transport configured");
    Ok(mailer)
}

fn required_api_url(config: &Config) -> Result<String> {
    config
        .email_api_url
        .clone()
        .ok_or(MailerError::NotConfigured("EMAIL_API_URL"))
}

fn required_api_key(config: &Config) -> Result<String> {
    config
        .email_api_key
        .clone()
        .ok_or(MailerError::NotConfigured("EMAIL_API_KEY"))
}

// ============================================================================
// Local Relay
// ============================================================================

/// Development relay that POSTs a flat JSON payload to a local inbox service.
#[derive(Debug)]
pub struct LocalMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl LocalMailer {
    /// Create the local relay transport from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http_client(config.email_send_timeout)?,
            api_url: required_api_url(config)?,
            api_key: required_api_key(config)?,
            from: config.email_from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for LocalMailer {
    fn provider_name(&self) -> &'static str {
        "local"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        info!(recipient = %recipient, subject = %subject, "Sending email");

        let payload = serde_json::json!({
            "from": self.from,
            "to": recipient,
            "subject": subject,
            "body": body,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        info!(
            status = response.status().as_u16(),
            recipient = %recipient,
            "Email send response"
        );
        check_response(response).await
    }
}

// ============================================================================
// SendGrid
// ============================================================================

/// SendGrid v3 mail send transport.
pub struct SendGridMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    sandbox_recipient: Option<String>,
}

impl SendGridMailer {
    /// Create the SendGrid transport from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http_client(config.email_send_timeout)?,
            api_url: required_api_url(config)?,
            api_key: required_api_key(config)?,
            from: config.email_from.clone(),
            sandbox_recipient: config.email_sandbox_recipient.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    fn provider_name(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let recipient = apply_sandbox(
            self.provider_name(),
            self.sandbox_recipient.as_deref(),
            recipient,
        );

        let payload = serde_json::json!({
            "personalizations": [{"to": [{"email": recipient}]}],
            "from": {"email": self.from},
            "subject": subject,
            "content": [{"type": "text/html", "value": body}],
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        info!(
            status = response.status().as_u16(),
            recipient = %recipient,
            "Sent email via SendGrid"
        );
        check_response(response).await
    }
}

// ============================================================================
// Mailgun
// ============================================================================

/// Mailgun messages transport. Posts form data with basic auth.
pub struct MailgunMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    sandbox_recipient: Option<String>,
}

impl MailgunMailer {
    /// Create the Mailgun transport from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http_client(config.email_send_timeout)?,
            api_url: required_api_url(config)?,
            api_key: required_api_key(config)?,
            from: config.email_from.clone(),
            sandbox_recipient: config.email_sandbox_recipient.clone(),
        })
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    fn provider_name(&self) -> &'static str {
        "mailgun"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let recipient = apply_sandbox(
            self.provider_name(),
            self.sandbox_recipient.as_deref(),
            recipient,
        );

        let form = [
            ("from", self.from.as_str()),
            ("to", recipient),
            ("subject", subject),
            ("html", body),
        ];

        let response = self
            .client
            .post(&self.api_url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        info!(
            status = response.status().as_u16(),
            recipient = %recipient,
            "Sent email via Mailgun"
        );
        check_response(response).await
    }
}

// ============================================================================
// Postmark
// ============================================================================

/// Postmark email transport. Authenticates with a server token header.
pub struct PostmarkMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    sandbox_recipient: Option<String>,
}

impl PostmarkMailer {
    /// Create the Postmark transport from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http_client(config.email_send_timeout)?,
            api_url: required_api_url(config)?,
            api_key: required_api_key(config)?,
            from: config.email_from.clone(),
            sandbox_recipient: config.email_sandbox_recipient.clone(),
        })
    }
}

#[async_trait]
impl Mailer for PostmarkMailer {
    fn provider_name(&self) -> &'static str {
        "postmark"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let recipient = apply_sandbox(
            self.provider_name(),
            self.sandbox_recipient.as_deref(),
            recipient,
        );

        let payload = serde_json::json!({
            "From": self.from,
            "To": recipient,
            "Subject": subject,
            "HtmlBody": body,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        info!(
            status = response.status().as_u16(),
            recipient = %recipient,
            "Sent email via Postmark"
        );
        check_response(response).await
    }
}
