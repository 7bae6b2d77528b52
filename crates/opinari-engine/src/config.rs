// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for opinari-engine.

use std::time::Duration;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL for the survey store
    pub database_url: String,
    /// Public web origin answer links point at (no trailing slash)
    pub web_origin: String,
    /// Email provider selector (local, sendgrid, mailgun, postmark)
    pub email_provider: String,
    /// Provider API endpoint
    pub email_api_url: Option<String>,
    /// Provider API key or server token
    pub email_api_key: Option<String>,
    /// Sender address stamped on outgoing mail
    pub email_from: String,
    /// When set, hosted provider sends are redirected to this address
    pub email_sandbox_recipient: Option<String>,
    /// Upper bound for a single transport send
    pub email_send_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("OPINARI_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| ConfigError::MissingEnvVar("OPINARI_DATABASE_URL or DATABASE_URL"))?;

        // Answer links embed this origin, so a trailing slash would produce
        // double-slash URLs
        let web_origin = std::env::var("WEB_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();

        let email_provider =
            std::env::var("EMAIL_PROVIDER").unwrap_or_else(|_| "local".to_string());

        let email_api_url = std::env::var("EMAIL_API_URL").ok();
        let email_api_key = std::env::var("EMAIL_API_KEY").ok();

        let email_from =
            std::env::var("EMAIL_FROM").unwrap_or_else(|_| "noreply@yourapp.com".to_string());

        let email_sandbox_recipient = std::env::var("EMAIL_SANDBOX_RECIPIENT").ok();

        let timeout_secs: u64 = std::env::var("EMAIL_SEND_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        Ok(Self {
            database_url,
            web_origin,
            email_provider,
            email_api_url,
            email_api_key,
            email_from,
            email_sandbox_recipient,
            email_send_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// The email send timeout is not a number of seconds.
    #[error("Invalid email send timeout")]
    InvalidTimeout,
}
