// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Opinari Core - Survey Storage Layer
//!
//! This crate provides durable storage for the Opinari survey engine. It owns
//! the data model (surveys, recipients, email tasks, responses), the embedded
//! schema migrations for both supported databases, and the response token
//! codec used in answer links.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      opinari-engine                         │
//! │      (Survey Lifecycle, Email Dispatch, Response Intake)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼ SurveyStore trait
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     opinari-core                            │
//! │                     (This Crate)                            │
//! │          Records / Migrations / Response Tokens             │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                  │
//!            ▼                                  ▼
//! ┌───────────────────────┐        ┌───────────────────────────┐
//! │      PostgreSQL       │        │          SQLite           │
//! │     (Production)      │        │   (Embedded / Testing)    │
//! └───────────────────────┘        └───────────────────────────┘
//! ```
//!
//! # Survey Status
//!
//! | Status | Description |
//! |--------|-------------|
//! | `ACTIVE` | Accepting responses; invitations may be dispatched |
//! | `CLOSED` | Past its end date or explicitly terminated |
//!
//! # Email Task Status
//!
//! | Status | Description |
//! |--------|-------------|
//! | `PENDING` | Waiting for the next dispatch run |
//! | `SENT` | Handed to the transport; terminal |
//! | `FAILED` | Last attempt failed; retry re-arms it to `PENDING` |
//!
//! # Transition Guards
//!
//! Status transitions are compare-and-set updates (`WHERE status = ...`), so
//! concurrent workers cannot apply the same transition twice. The caller that
//! wins the update learns it from the boolean return and runs any follow-up
//! (for example the survey-ended notification) exactly once.
//!
//! # Modules
//!
//! - [`error`]: Error type shared by both store backends
//! - [`migrations`]: Embedded migrations for PostgreSQL and SQLite
//! - [`store`]: The `SurveyStore` trait, record types, and both backends
//! - [`token`]: Response token generation for answer links

#![deny(missing_docs)]

/// Error type shared by both store backends.
pub mod error;

/// Embedded database migrations.
pub mod migrations;

/// The `SurveyStore` trait, record types, and the PostgreSQL and SQLite backends.
pub mod store;

/// Response token generation for answer links.
pub mod token;

pub use error::StoreError;
pub use store::{
    EmailTaskCounts, EmailTaskRecord, EmailTaskStatus, ListSurveysFilter, NewRecipient,
    NewResponse, NewSurvey, PostgresStore, RecipientRecord, ResponseRecord, SqliteStore,
    SurveyAnswer, SurveyRecord, SurveyStatus, SurveyStore,
};
