// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mailer trait definitions.
//!
//! Defines the abstract interface for email transports.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from mailer operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MailerError {
    /// HTTP transport failed (connection, TLS, timeout).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider rejected the send with a non-success status.
    #[error("Provider returned status {status}: {body}")]
    Api {
        /// HTTP status code from the provider.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// A setting the selected provider needs is missing.
    #[error("Missing email provider setting: {0}")]
    NotConfigured(&'static str),

    /// Other error.
    #[error("Other: {0}")]
    Other(String),
}

/// Result type for mailer operations.
pub type Result<T> = std::result::Result<T, MailerError>;

/// Trait for email transports.
///
/// Mailers are PURE transports - they do NOT touch the database. Task status
/// bookkeeping (SENT/FAILED) is handled by the caller.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Provider identifier (e.g., "local", "sendgrid", "mailgun", "postmark")
    fn provider_name(&self) -> &'static str;

    /// Deliver one HTML email to one recipient.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}
