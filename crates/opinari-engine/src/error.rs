// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for opinari-engine.
//!
//! Provides a unified error type whose stable codes an embedding API layer
//! can map to wire responses.

use thiserror::Error;

/// Engine errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Survey store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] opinari_core::StoreError),

    /// Email transport failed.
    #[error("Email transport error: {0}")]
    Transport(#[from] crate::mailer::MailerError),

    /// Survey was not found (or is not visible to the caller).
    #[error("Survey not found: {0}")]
    SurveyNotFound(String),

    /// Request validation failed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response token does not match any recipient of the survey.
    #[error("Invalid response token")]
    InvalidToken,

    /// A response for this recipient is already recorded.
    #[error("Response already recorded for this recipient")]
    AlreadyResponded,

    /// The survey is closed and no longer accepts this operation.
    #[error("Survey is closed")]
    SurveyClosed,

    /// The survey was already closed when a close was requested.
    #[error("Survey is already closed")]
    AlreadyClosed,
}

impl Error {
    /// Stable error code for wire responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Database(_) | Self::Migration(_) | Self::Store(_) => "DATABASE_ERROR",
            Self::Transport(_) => "TRANSPORT_FAILURE",
            Self::SurveyNotFound(_) => "SURVEY_NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::AlreadyResponded => "ALREADY_RESPONDED",
            Self::SurveyClosed => "SURVEY_CLOSED",
            Self::AlreadyClosed => "ALREADY_CLOSED",
        }
    }
}

/// Result type using Engine Error.
pub type Result<T> = std::result::Result<T, Error>;
