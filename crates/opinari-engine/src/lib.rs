// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Opinari Engine - Survey Lifecycle and Notification Dispatch
//!
//! This crate is the embeddable core of the survey service. It owns survey
//! lifecycle transitions, invitation dispatch with per-recipient retry, and
//! response recording; an HTTP layer on top only maps requests and errors
//! onto the wire.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embedding Request Layer                       │
//! │              (HTTP routes, auth, wire status codes)              │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   opinari-engine (This Crate)                    │
//! │  ┌────────────┐  ┌───────────┐  ┌──────────┐  ┌─────────────┐   │
//! │  │  Handlers  │  │ Lifecycle │  │ Dispatch │  │  Launcher   │   │
//! │  │ (EngineState)│ (lazy expiry)│ (invitations)│(detached runs)│ │
//! │  └────────────┘  └───────────┘  └──────────┘  └─────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//!          │                                          │
//!          ▼                                          ▼
//! ┌───────────────────────┐              ┌─────────────────────────┐
//! │     opinari-core      │              │     Email Provider      │
//! │ (SurveyStore trait,   │              │ (local, SendGrid,       │
//! │  PostgreSQL / SQLite) │              │  Mailgun, Postmark)     │
//! └───────────────────────┘              └─────────────────────────┘
//! ```
//!
//! # Operations
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | `handle_create_survey` | Create a survey, its recipients and PENDING tasks; spawn dispatch |
//! | `handle_get_survey` | Owner view with results and delivery state |
//! | `handle_get_survey_public` | Unscoped view for the answer page |
//! | `handle_list_surveys` | Owner listing with name filter and pagination |
//! | `handle_terminate_survey` | Close an ACTIVE survey and notify recipients |
//! | `handle_retry_failed_emails` | Re-arm FAILED tasks and re-run dispatch |
//! | `handle_record_response` | Record one answer via token or raw email |
//! | `handle_delete_survey` | Delete a survey and everything attached to it |
//! | `handle_survey_results` | Detailed per-response results for the owner |
//!
//! # Survey Status State Machine
//!
//! ```text
//!      ┌────────┐   expiry read / terminate   ┌────────┐
//!      │ ACTIVE │ ──────────────────────────► │ CLOSED │
//!      └────────┘                             └────────┘
//! ```
//!
//! The transition is one-way and runs through a compare-and-set in the
//! store, so the "survey ended" notification fires exactly once no matter
//! how many readers race past the deadline.
//!
//! # Email Task State Machine
//!
//! ```text
//!      ┌─────────┐  send ok   ┌──────┐
//!      │ PENDING │ ─────────► │ SENT │   (terminal)
//!      └─────────┘            └──────┘
//!           │  ▲
//!   send err│  │ dispatch re-arm
//!           ▼  │
//!      ┌────────┐
//!      │ FAILED │
//!      └────────┘
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `OPINARI_DATABASE_URL` | Yes* | - | PostgreSQL connection string |
//! | `DATABASE_URL` | Yes* | - | Fallback if above not set |
//! | `WEB_ORIGIN` | No | `http://localhost:5173` | Base origin for answer links |
//! | `EMAIL_PROVIDER` | No | `local` | `local`, `sendgrid`, `mailgun` or `postmark` |
//! | `EMAIL_API_URL` | No | - | Provider endpoint (required by every provider) |
//! | `EMAIL_API_KEY` | No | - | Provider credential (required by hosted providers) |
//! | `EMAIL_FROM` | No | `noreply@yourapp.com` | Sender address |
//! | `EMAIL_SANDBOX_RECIPIENT` | No | - | Redirect all hosted-provider mail here |
//! | `EMAIL_SEND_TIMEOUT_SECS` | No | `30` | Per-send transport timeout |
//!
//! # Modules
//!
//! - [`config`]: Engine configuration from environment variables
//! - [`dispatch`]: Invitation dispatch engine and ended notifications
//! - [`email`]: Subject lines, HTML bodies and answer links
//! - [`error`]: Engine error type with stable codes
//! - [`handlers`]: Engine operations over a shared [`EngineState`]
//! - [`launcher`]: Detached execution of dispatch runs
//! - [`lifecycle`]: ACTIVE to CLOSED transition logic
//! - [`mailer`]: Email transport trait and provider implementations

#![deny(missing_docs)]

/// Engine configuration loaded from environment variables.
pub mod config;

/// Invitation dispatch engine and ended notifications.
pub mod dispatch;

/// Email subjects, bodies and answer links.
pub mod email;

/// Error types for engine operations.
pub mod error;

/// Engine operations over a shared state.
pub mod handlers;

/// Detached execution of dispatch runs.
pub mod launcher;

/// Survey lifecycle evaluation.
pub mod lifecycle;

/// Email transport trait and provider implementations.
pub mod mailer;

pub use config::Config;
pub use error::{Error, Result};
pub use handlers::EngineState;
