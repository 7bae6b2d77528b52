// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock mailer for testing.
//!
//! A simple transport that records outgoing mail in memory instead of
//! calling a provider.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::traits::{Mailer, MailerError, Result};

/// One recorded email.
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Recipient address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
}

/// Mock mailer for testing.
pub struct MockMailer {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    failing_recipients: Arc<Mutex<HashSet<String>>>,
    /// If true, every send fails.
    pub fail_by_default: bool,
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMailer {
    /// Create a new mock mailer that accepts everything.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing_recipients: Arc::new(Mutex::new(HashSet::new())),
            fail_by_default: false,
        }
    }

    /// Create a mock mailer where every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing_recipients: Arc::new(Mutex::new(HashSet::new())),
            fail_by_default: true,
        }
    }

    /// Make sends to one recipient fail while others keep succeeding.
    pub async fn fail_for(&self, recipient: &str) {
        self.failing_recipients
            .lock()
            .await
            .insert(recipient.to_string());
    }

    /// Let a previously failing recipient succeed again.
    pub async fn recover(&self, recipient: &str) {
        self.failing_recipients.lock().await.remove(recipient);
    }

    /// Snapshot of everything sent so far, in send order.
    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }

    /// Number of emails sent so far.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Whether an email was sent to the given recipient.
    pub async fn sent_to(&self, recipient: &str) -> bool {
        self.sent
            .lock()
            .await
            .iter()
            .any(|email| email.recipient == recipient)
    }

    /// Forget all recorded mail.
    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl Mailer for MockMailer {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if self.fail_by_default {
            return Err(MailerError::Other("Mock failure".to_string()));
        }
        if self.failing_recipients.lock().await.contains(recipient) {
            return Err(MailerError::Other(format!(
                "Mock failure for {}",
                recipient
            )));
        }

        self.sent.lock().await.push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
