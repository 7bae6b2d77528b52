// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for opinari-core.

use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// I/O operation failed (e.g. creating the SQLite data directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type using [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
