// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for opinari-core.
//!
//! This module defines the storage abstraction behind the survey engine and
//! its backend implementations. All survey state lives here: the surveys
//! themselves, their recipients (with response tokens), the per-recipient
//! email tasks the dispatch engine works through, and recorded responses.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Lifecycle status of a survey.
///
/// Transitions are monotonic: ACTIVE -> CLOSED, never back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurveyStatus {
    /// Accepting responses; invitations may be dispatched.
    #[default]
    Active,
    /// Past its end date or explicitly terminated.
    Closed,
}

impl SurveyStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyStatus::Active => "ACTIVE",
            SurveyStatus::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SurveyStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SurveyStatus::Active),
            "CLOSED" => Ok(SurveyStatus::Closed),
            _ => Err(format!("Unknown survey status: {}", s)),
        }
    }
}

/// Status of one invitation email task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailTaskStatus {
    /// Eligible for the next dispatch run.
    #[default]
    Pending,
    /// Delivered to the transport; terminal.
    Sent,
    /// Last attempt failed; a retry re-arms it to PENDING.
    Failed,
}

impl EmailTaskStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailTaskStatus::Pending => "PENDING",
            EmailTaskStatus::Sent => "SENT",
            EmailTaskStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for EmailTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmailTaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(EmailTaskStatus::Pending),
            "SENT" => Ok(EmailTaskStatus::Sent),
            "FAILED" => Ok(EmailTaskStatus::Failed),
            _ => Err(format!("Unknown email task status: {}", s)),
        }
    }
}

/// One of the three allowed answers to a survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurveyAnswer {
    /// Affirmative.
    Yes,
    /// Negative.
    No,
    /// Recipient cannot answer the question.
    CantAnswer,
}

impl SurveyAnswer {
    /// Stored string form, also used verbatim in answer links.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyAnswer::Yes => "YES",
            SurveyAnswer::No => "NO",
            SurveyAnswer::CantAnswer => "CANT_ANSWER",
        }
    }

    /// All answers, in the order they appear in invitation emails.
    pub const ALL: [SurveyAnswer; 3] =
        [SurveyAnswer::Yes, SurveyAnswer::No, SurveyAnswer::CantAnswer];
}

impl std::fmt::Display for SurveyAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SurveyAnswer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "YES" => Ok(SurveyAnswer::Yes),
            "NO" => Ok(SurveyAnswer::No),
            "CANT_ANSWER" => Ok(SurveyAnswer::CantAnswer),
            _ => Err(format!("Unknown answer: {}", s)),
        }
    }
}

/// Survey record from the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SurveyRecord {
    /// Unique identifier for the survey.
    pub id: Uuid,
    /// Human-readable survey name (also the email subject ingredient).
    pub name: String,
    /// The single question recipients answer.
    pub question: String,
    /// When the survey stops accepting responses.
    pub end_date: DateTime<Utc>,
    /// When true, results omit respondent identities.
    pub is_anonymous: bool,
    /// Owner identity; all owner-scoped reads filter on this.
    pub owner_id: Uuid,
    /// Current status (ACTIVE, CLOSED).
    pub status: String,
    /// When the survey was created.
    pub created_at: DateTime<Utc>,
    /// When the survey was last mutated (creation or close).
    pub updated_at: DateTime<Utc>,
}

impl SurveyRecord {
    /// Whether the stored status is ACTIVE.
    pub fn is_active(&self) -> bool {
        self.status == SurveyStatus::Active.as_str()
    }

    /// Whether the stored status is CLOSED.
    pub fn is_closed(&self) -> bool {
        self.status == SurveyStatus::Closed.as_str()
    }
}

/// Recipient record from the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipientRecord {
    /// Unique identifier for the recipient row.
    pub id: Uuid,
    /// Survey this recipient belongs to.
    pub survey_id: Uuid,
    /// Invited email address.
    pub email: String,
    /// Opaque credential embedded in this recipient's answer links.
    pub response_token: String,
    /// When the recipient was created (always survey creation time).
    pub created_at: DateTime<Utc>,
}

/// Email task record from the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailTaskRecord {
    /// Unique identifier for the task.
    pub id: Uuid,
    /// Survey this task belongs to.
    pub survey_id: Uuid,
    /// Recipient email this invitation targets.
    pub recipient_email: String,
    /// Current status (PENDING, SENT, FAILED).
    pub status: String,
    /// When the invitation was handed to the transport; set only on SENT.
    pub sent_at: Option<DateTime<Utc>>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

/// Recorded response from the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResponseRecord {
    /// Unique identifier for the response row.
    pub id: Uuid,
    /// Survey this response belongs to.
    pub survey_id: Uuid,
    /// Email the response is attributed to (token-resolved or self-supplied).
    pub recipient_email: String,
    /// Recorded answer (YES, NO, CANT_ANSWER).
    pub answer: String,
    /// When the response was recorded.
    pub answered_at: DateTime<Utc>,
}

/// A survey to create, with its full recipient list.
#[derive(Debug, Clone)]
pub struct NewSurvey {
    /// Survey name.
    pub name: String,
    /// Question text.
    pub question: String,
    /// Closing deadline.
    pub end_date: DateTime<Utc>,
    /// Hide respondent identities in results.
    pub is_anonymous: bool,
    /// Owning user.
    pub owner_id: Uuid,
    /// Recipients, already deduplicated and carrying fresh tokens.
    pub recipients: Vec<NewRecipient>,
}

/// A recipient to create alongside a survey.
#[derive(Debug, Clone)]
pub struct NewRecipient {
    /// Invited email address.
    pub email: String,
    /// Pre-generated response token (see [`crate::token`]).
    pub response_token: String,
}

/// A response to record.
#[derive(Debug, Clone)]
pub struct NewResponse {
    /// Survey being answered.
    pub survey_id: Uuid,
    /// Resolved recipient email.
    pub recipient_email: String,
    /// The answer.
    pub answer: SurveyAnswer,
    /// Recording timestamp.
    pub answered_at: DateTime<Utc>,
}

/// Filter options for listing surveys. Owner scoping is a separate argument
/// since it is mandatory.
#[derive(Debug, Clone)]
pub struct ListSurveysFilter {
    /// Case-insensitive substring match on the survey name.
    pub name_contains: Option<String>,
    /// Maximum rows returned.
    pub limit: i64,
    /// Rows skipped before the first returned one.
    pub offset: i64,
}

impl Default for ListSurveysFilter {
    fn default() -> Self {
        Self {
            name_contains: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Per-status email task counts for one survey.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTaskCounts {
    /// Tasks in SENT.
    pub sent: i64,
    /// Tasks in PENDING.
    pub pending: i64,
    /// Tasks in FAILED.
    pub failed: i64,
    /// All tasks for the survey.
    pub total: i64,
}

/// Storage abstraction behind the survey engine.
///
/// Both backends implement identical semantics; the engine only ever talks
/// to this trait. Status transitions are guarded in SQL (`WHERE status =`)
/// so concurrent callers cannot apply the same transition twice.
#[allow(missing_docs)]
#[async_trait::async_trait]
pub trait SurveyStore: Send + Sync {
    /// Create a survey together with its recipients and one PENDING email
    /// task per recipient, in a single transaction. A survey is never
    /// visible without its recipients.
    async fn create_survey(&self, survey: NewSurvey) -> Result<SurveyRecord, StoreError>;

    async fn get_survey(&self, survey_id: Uuid) -> Result<Option<SurveyRecord>, StoreError>;

    /// Fetch a survey only when the owner matches. A survey owned by someone
    /// else comes back as `None`, indistinguishable from a missing id.
    async fn get_survey_for_owner(
        &self,
        survey_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<SurveyRecord>, StoreError>;

    /// List an owner's surveys, newest first.
    async fn list_surveys(
        &self,
        owner_id: Uuid,
        filter: &ListSurveysFilter,
    ) -> Result<Vec<SurveyRecord>, StoreError>;

    /// Count the rows `list_surveys` would match, ignoring limit/offset.
    async fn count_surveys(
        &self,
        owner_id: Uuid,
        name_contains: Option<&str>,
    ) -> Result<i64, StoreError>;

    /// Transition ACTIVE -> CLOSED. Returns true only for the caller whose
    /// update actually applied; a false return means the survey was already
    /// CLOSED (or does not exist). This is the single primitive behind both
    /// lazy expiry and explicit terminate, so the ended-notification fires
    /// exactly once per survey.
    async fn close_survey_if_active(
        &self,
        survey_id: Uuid,
        closed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete a survey and, by cascade, its recipients, tasks and responses.
    /// Returns false if no such survey existed.
    async fn delete_survey(&self, survey_id: Uuid) -> Result<bool, StoreError>;

    async fn list_recipients(&self, survey_id: Uuid)
    -> Result<Vec<RecipientRecord>, StoreError>;

    async fn get_recipient_by_token(
        &self,
        survey_id: Uuid,
        response_token: &str,
    ) -> Result<Option<RecipientRecord>, StoreError>;

    async fn get_recipient_by_email(
        &self,
        survey_id: Uuid,
        email: &str,
    ) -> Result<Option<RecipientRecord>, StoreError>;

    /// List a survey's email tasks, optionally restricted to one status,
    /// oldest first.
    async fn list_email_tasks(
        &self,
        survey_id: Uuid,
        status: Option<EmailTaskStatus>,
    ) -> Result<Vec<EmailTaskRecord>, StoreError>;

    /// Re-arm every FAILED task to PENDING for the next dispatch run.
    /// Returns how many tasks were re-armed.
    async fn reset_failed_email_tasks(&self, survey_id: Uuid) -> Result<u64, StoreError>;

    /// Transition one task PENDING -> SENT and stamp `sent_at`. Returns
    /// false if the task was not PENDING (e.g. a concurrent run already
    /// resolved it); SENT is terminal either way.
    async fn mark_email_task_sent(
        &self,
        task_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Transition one task PENDING -> FAILED. Returns false if the task was
    /// not PENDING; a SENT task is never demoted.
    async fn mark_email_task_failed(&self, task_id: Uuid) -> Result<bool, StoreError>;

    async fn email_task_counts(&self, survey_id: Uuid) -> Result<EmailTaskCounts, StoreError>;

    /// Insert a response unless one already exists for (survey, email).
    /// Returns false on the duplicate path; the uniqueness constraint makes
    /// this race-safe without a separate lock.
    async fn insert_response(&self, response: NewResponse) -> Result<bool, StoreError>;

    async fn has_response(&self, survey_id: Uuid, email: &str) -> Result<bool, StoreError>;

    /// List a survey's responses, oldest first.
    async fn list_responses(&self, survey_id: Uuid) -> Result<Vec<ResponseRecord>, StoreError>;
}

/// Fold `(status, count)` rows into [`EmailTaskCounts`]. Shared by both
/// backends.
pub(crate) fn fold_task_counts(rows: Vec<(String, i64)>) -> EmailTaskCounts {
    let mut counts = EmailTaskCounts::default();
    for (status, count) in rows {
        match status.as_str() {
            "SENT" => counts.sent = count,
            "PENDING" => counts.pending = count,
            "FAILED" => counts.failed = count,
            _ => {}
        }
        counts.total += count;
    }
    counts
}
