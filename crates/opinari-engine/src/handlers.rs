// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Survey engine operations.
//!
//! Free handler functions over a shared [`EngineState`]. Each handler
//! returns a typed payload or an [`Error`](crate::Error); the embedding
//! request layer maps both onto its wire format. Every read path runs the
//! lazy expiry check before acting, so callers never observe an ACTIVE
//! survey past its end date.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use opinari_core::token::generate_response_token;
use opinari_core::{
    ListSurveysFilter, NewRecipient, NewResponse, NewSurvey, PostgresStore, ResponseRecord,
    SurveyAnswer, SurveyRecord, SurveyStore,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::launcher;
use crate::lifecycle;
use crate::mailer::{self, Mailer};

/// Maximum recipients per survey.
pub const MAX_RECIPIENTS: usize = 50;

/// Maximum survey name length in characters.
const MAX_NAME_LEN: usize = 255;

/// Default page size for survey listings.
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
const MAX_PAGE_SIZE: u32 = 100;

/// Shared state for survey engine handlers.
///
/// Cheap to clone; detached dispatch runs own a clone so they can outlive
/// the request that spawned them.
#[derive(Clone)]
pub struct EngineState {
    /// Survey store backing every read and write.
    pub store: Arc<dyn SurveyStore>,
    /// Email transport used by dispatch runs.
    pub mailer: Arc<dyn Mailer>,
    /// Base origin embedded in answer links.
    pub web_origin: String,
}

impl EngineState {
    /// Create a state from existing store and mailer instances.
    pub fn new(
        store: Arc<dyn SurveyStore>,
        mailer: Arc<dyn Mailer>,
        web_origin: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            web_origin: web_origin.into(),
        }
    }

    /// Connect to PostgreSQL, run migrations and build the configured
    /// mailer.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;
        opinari_core::migrations::run_postgres(&pool).await?;

        let mailer = mailer::from_config(config)?;
        info!(
            provider = mailer.provider_name(),
            web_origin = %config.web_origin,
            "survey engine initialized"
        );

        Ok(Self {
            store: Arc::new(PostgresStore::new(pool)),
            mailer,
            web_origin: config.web_origin.clone(),
        })
    }
}

// ============================================================================
// Shared payload pieces
// ============================================================================

/// Aggregated answer counts for one survey.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AnswerTotals {
    /// YES answers.
    pub yes: i64,
    /// NO answers.
    pub no: i64,
    /// CANT_ANSWER answers.
    pub cant_answer: i64,
}

impl AnswerTotals {
    /// Tally recorded responses into per-answer counts.
    pub fn tally(responses: &[ResponseRecord]) -> Self {
        let mut totals = Self::default();
        for response in responses {
            match response.answer.parse() {
                Ok(SurveyAnswer::Yes) => totals.yes += 1,
                Ok(SurveyAnswer::No) => totals.no += 1,
                Ok(SurveyAnswer::CantAnswer) => totals.cant_answer += 1,
                Err(_) => {}
            }
        }
        totals
    }

    /// Total responses counted.
    pub fn total(&self) -> i64 {
        self.yes + self.no + self.cant_answer
    }
}

/// Delivery state of one invitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTaskInfo {
    /// Recipient email address.
    pub recipient: String,
    /// Task status (PENDING, SENT, FAILED).
    pub status: String,
    /// When the invitation was handed to the transport, if it was.
    pub sent_at: Option<DateTime<Utc>>,
}

/// Respondent identities, withheld for anonymous surveys.
fn respondent_emails(survey: &SurveyRecord, responses: &[ResponseRecord]) -> Option<Vec<String>> {
    if survey.is_anonymous {
        None
    } else {
        Some(
            responses
                .iter()
                .map(|response| response.recipient_email.clone())
                .collect(),
        )
    }
}

/// Minimal syntactic email check: a single `@` with a non-empty local part
/// and a dotted domain.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

// ============================================================================
// Create Survey
// ============================================================================

/// Request to create a survey with its recipient list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurveyRequest {
    /// Survey name, 1 to 255 characters.
    pub name: String,
    /// Question text.
    pub question: String,
    /// Closing deadline.
    pub end_date: DateTime<Utc>,
    /// Hide respondent identities in results.
    pub is_anonymous: bool,
    /// Owning user.
    pub owner_id: Uuid,
    /// Recipient emails, 1 to 50, unique.
    pub recipients: Vec<String>,
}

/// The created survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurveyResponse {
    /// Survey id.
    pub id: Uuid,
    /// Survey name.
    pub name: String,
    /// Question text.
    pub question: String,
    /// Closing deadline.
    pub end_date: DateTime<Utc>,
    /// Whether results hide respondent identities.
    pub is_anonymous: bool,
    /// Invited emails.
    pub recipients: Vec<String>,
    /// Survey status, ACTIVE at creation.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

fn validate_create(request: &CreateSurveyRequest) -> Result<()> {
    if request.name.is_empty() {
        return Err(Error::InvalidRequest(
            "survey name must not be empty".to_string(),
        ));
    }
    if request.name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidRequest(format!(
            "survey name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if request.question.is_empty() {
        return Err(Error::InvalidRequest(
            "survey question must not be empty".to_string(),
        ));
    }
    if request.recipients.is_empty() {
        return Err(Error::InvalidRequest(
            "at least one recipient is required".to_string(),
        ));
    }
    if request.recipients.len() > MAX_RECIPIENTS {
        return Err(Error::InvalidRequest(format!(
            "at most {MAX_RECIPIENTS} recipients are allowed"
        )));
    }

    let mut seen = HashSet::new();
    for email in &request.recipients {
        if !is_valid_email(email) {
            return Err(Error::InvalidRequest(format!(
                "invalid recipient email: {email}"
            )));
        }
        if !seen.insert(email.as_str()) {
            return Err(Error::InvalidRequest(format!(
                "duplicate recipient email: {email}"
            )));
        }
    }

    Ok(())
}

/// Create a survey, persist one PENDING email task per recipient and spawn
/// the invitation dispatch run.
///
/// A past `end_date` is accepted; the survey will close on its first read.
#[instrument(skip(state, request), fields(owner_id = %request.owner_id))]
pub async fn handle_create_survey(
    state: &EngineState,
    request: CreateSurveyRequest,
) -> Result<CreateSurveyResponse> {
    validate_create(&request)?;

    let recipients = request
        .recipients
        .iter()
        .map(|email| NewRecipient {
            email: email.clone(),
            response_token: generate_response_token(),
        })
        .collect();

    let survey = state
        .store
        .create_survey(NewSurvey {
            name: request.name,
            question: request.question,
            end_date: request.end_date,
            is_anonymous: request.is_anonymous,
            owner_id: request.owner_id,
            recipients,
        })
        .await?;

    info!(
        survey_id = %survey.id,
        recipients = request.recipients.len(),
        "survey created"
    );
    launcher::spawn_dispatch(state.clone(), survey.id);

    Ok(CreateSurveyResponse {
        id: survey.id,
        name: survey.name,
        question: survey.question,
        end_date: survey.end_date,
        is_anonymous: survey.is_anonymous,
        recipients: request.recipients,
        status: survey.status,
        created_at: survey.created_at,
        updated_at: survey.updated_at,
    })
}

// ============================================================================
// Get Survey (owner)
// ============================================================================

/// Owner-scoped survey fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSurveyRequest {
    /// Survey id.
    pub survey_id: Uuid,
    /// Caller identity; must own the survey.
    pub owner_id: Uuid,
}

/// Full owner view of a survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSurveyResponse {
    /// Survey id.
    pub id: Uuid,
    /// Survey name.
    pub name: String,
    /// Question text.
    pub question: String,
    /// Closing deadline.
    pub end_date: DateTime<Utc>,
    /// Whether results hide respondent identities.
    pub is_anonymous: bool,
    /// Invited emails.
    pub recipients: Vec<String>,
    /// Survey status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Aggregated answer counts.
    pub results: AnswerTotals,
    /// Who responded; `None` for anonymous surveys.
    pub respondent_emails: Option<Vec<String>>,
    /// Per-invitation delivery state.
    pub email_status: Vec<EmailTaskInfo>,
}

/// Fetch a survey with results and delivery state. Owner-scoped: a survey
/// owned by someone else is reported as not found.
#[instrument(skip(state, request), fields(survey_id = %request.survey_id))]
pub async fn handle_get_survey(
    state: &EngineState,
    request: GetSurveyRequest,
) -> Result<GetSurveyResponse> {
    debug!("fetching survey detail");

    let survey = state
        .store
        .get_survey_for_owner(request.survey_id, request.owner_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(request.survey_id.to_string()))?;
    let survey = lifecycle::close_if_expired(state, survey).await?;

    let recipients = state.store.list_recipients(survey.id).await?;
    let responses = state.store.list_responses(survey.id).await?;
    let tasks = state.store.list_email_tasks(survey.id, None).await?;

    let results = AnswerTotals::tally(&responses);
    let respondent_emails = respondent_emails(&survey, &responses);

    Ok(GetSurveyResponse {
        id: survey.id,
        name: survey.name,
        question: survey.question,
        end_date: survey.end_date,
        is_anonymous: survey.is_anonymous,
        recipients: recipients.into_iter().map(|r| r.email).collect(),
        status: survey.status,
        created_at: survey.created_at,
        updated_at: survey.updated_at,
        results,
        respondent_emails,
        email_status: tasks
            .into_iter()
            .map(|task| EmailTaskInfo {
                recipient: task.recipient_email,
                status: task.status,
                sent_at: task.sent_at,
            })
            .collect(),
    })
}

// ============================================================================
// Get Survey (public)
// ============================================================================

/// Public view of a survey, for recipients following an answer link.
/// Carries no recipient list and no results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSurveyResponse {
    /// Survey id.
    pub id: Uuid,
    /// Survey name.
    pub name: String,
    /// Question text.
    pub question: String,
    /// Closing deadline.
    pub end_date: DateTime<Utc>,
    /// Whether the survey is anonymous.
    pub is_anonymous: bool,
    /// Survey status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Fetch a survey without owner scoping, for the public answer page.
#[instrument(skip(state))]
pub async fn handle_get_survey_public(
    state: &EngineState,
    survey_id: Uuid,
) -> Result<PublicSurveyResponse> {
    let survey = state
        .store
        .get_survey(survey_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(survey_id.to_string()))?;
    let survey = lifecycle::close_if_expired(state, survey).await?;

    Ok(PublicSurveyResponse {
        id: survey.id,
        name: survey.name,
        question: survey.question,
        end_date: survey.end_date,
        is_anonymous: survey.is_anonymous,
        status: survey.status,
        created_at: survey.created_at,
        updated_at: survey.updated_at,
    })
}

// ============================================================================
// List Surveys
// ============================================================================

/// Owner-scoped survey listing with optional name filter and pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSurveysRequest {
    /// Caller identity; only this owner's surveys are listed.
    pub owner_id: Uuid,
    /// Case-insensitive substring match on the survey name.
    pub name: Option<String>,
    /// 1-based page number, default 1.
    pub page: Option<u32>,
    /// Page size, default 20, capped at 100.
    pub page_size: Option<u32>,
}

/// One survey in a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummary {
    /// Survey id.
    pub id: Uuid,
    /// Survey name.
    pub name: String,
    /// Question text.
    pub question: String,
    /// Closing deadline.
    pub end_date: DateTime<Utc>,
    /// Whether results hide respondent identities.
    pub is_anonymous: bool,
    /// Invited emails.
    pub recipients: Vec<String>,
    /// Survey status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Aggregated answer counts.
    pub results: AnswerTotals,
    /// Who responded; omitted for anonymous surveys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respondent_emails: Option<Vec<String>>,
}

/// A page of surveys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSurveysResponse {
    /// Surveys on this page, newest first.
    pub items: Vec<SurveySummary>,
    /// Total matching surveys across all pages.
    pub total: i64,
    /// The page returned.
    pub page: u32,
    /// The page size used.
    pub page_size: u32,
}

/// List an owner's surveys, newest first, running the expiry check on each
/// returned survey.
#[instrument(skip(state, request), fields(owner_id = %request.owner_id))]
pub async fn handle_list_surveys(
    state: &EngineState,
    request: ListSurveysRequest,
) -> Result<ListSurveysResponse> {
    let page = request.page.unwrap_or(1).max(1);
    let page_size = request
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let name_contains = request.name.filter(|name| !name.is_empty());

    debug!(page, page_size, name = ?name_contains, "listing surveys");

    let total = state
        .store
        .count_surveys(request.owner_id, name_contains.as_deref())
        .await?;

    let filter = ListSurveysFilter {
        name_contains,
        limit: i64::from(page_size),
        offset: (i64::from(page) - 1) * i64::from(page_size),
    };
    let surveys = state.store.list_surveys(request.owner_id, &filter).await?;

    let mut items = Vec::with_capacity(surveys.len());
    for survey in surveys {
        let survey = lifecycle::close_if_expired(state, survey).await?;
        let recipients = state.store.list_recipients(survey.id).await?;
        let responses = state.store.list_responses(survey.id).await?;

        let results = AnswerTotals::tally(&responses);
        let respondent_emails = respondent_emails(&survey, &responses);

        items.push(SurveySummary {
            id: survey.id,
            name: survey.name,
            question: survey.question,
            end_date: survey.end_date,
            is_anonymous: survey.is_anonymous,
            recipients: recipients.into_iter().map(|r| r.email).collect(),
            status: survey.status,
            created_at: survey.created_at,
            updated_at: survey.updated_at,
            results,
            respondent_emails,
        });
    }

    Ok(ListSurveysResponse {
        items,
        total,
        page,
        page_size,
    })
}

// ============================================================================
// Terminate Survey
// ============================================================================

/// Owner-initiated close command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateSurveyRequest {
    /// Survey id.
    pub survey_id: Uuid,
    /// Caller identity; must own the survey.
    pub owner_id: Uuid,
}

/// Close an ACTIVE survey and spawn the ended notification. Fails with
/// [`Error::AlreadyClosed`] when the survey is already CLOSED, including
/// when the expiry check closed it just now.
#[instrument(skip(state, request), fields(survey_id = %request.survey_id))]
pub async fn handle_terminate_survey(
    state: &EngineState,
    request: TerminateSurveyRequest,
) -> Result<()> {
    let survey = state
        .store
        .get_survey_for_owner(request.survey_id, request.owner_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(request.survey_id.to_string()))?;
    let survey = lifecycle::close_if_expired(state, survey).await?;
    if survey.is_closed() {
        return Err(Error::AlreadyClosed);
    }

    if state
        .store
        .close_survey_if_active(survey.id, Utc::now())
        .await?
    {
        info!(survey_id = %survey.id, "survey terminated");
        launcher::spawn_ended_notification(state.clone(), survey.id);
        Ok(())
    } else {
        // Lost a close race since the read above.
        Err(Error::AlreadyClosed)
    }
}

// ============================================================================
// Retry Failed Emails
// ============================================================================

/// Owner-initiated re-dispatch of failed invitations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryFailedEmailsRequest {
    /// Survey id.
    pub survey_id: Uuid,
    /// Caller identity; must own the survey.
    pub owner_id: Uuid,
}

/// Spawn a dispatch run that re-arms FAILED tasks and attempts them again.
/// Returns once the run is scheduled, not once it has finished.
#[instrument(skip(state, request), fields(survey_id = %request.survey_id))]
pub async fn handle_retry_failed_emails(
    state: &EngineState,
    request: RetryFailedEmailsRequest,
) -> Result<()> {
    let survey = state
        .store
        .get_survey_for_owner(request.survey_id, request.owner_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(request.survey_id.to_string()))?;
    let survey = lifecycle::close_if_expired(state, survey).await?;
    if survey.is_closed() {
        return Err(Error::SurveyClosed);
    }

    info!(survey_id = %survey.id, "retrying failed invitations");
    launcher::spawn_dispatch(state.clone(), survey.id);
    Ok(())
}

// ============================================================================
// Record Response
// ============================================================================

/// An answer submitted through an answer link or the public form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponseRequest {
    /// Survey id.
    pub survey_id: Uuid,
    /// Response token from an answer link.
    pub token: Option<String>,
    /// Self-supplied email for the token-less path.
    pub email: Option<String>,
    /// Answer value (YES, NO, CANT_ANSWER).
    pub answer: String,
}

/// Record one answer for a survey.
///
/// The respondent is resolved from the token when one is supplied, falling
/// back to the raw email; the token-less path accepts any syntactically
/// valid address so self-service responses work without an invitation.
#[instrument(skip(state, request), fields(survey_id = %request.survey_id))]
pub async fn handle_record_response(
    state: &EngineState,
    request: RecordResponseRequest,
) -> Result<()> {
    let answer: SurveyAnswer = request.answer.parse().map_err(Error::InvalidRequest)?;

    let survey = state
        .store
        .get_survey(request.survey_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(request.survey_id.to_string()))?;
    let survey = lifecycle::close_if_expired(state, survey).await?;
    if !survey.is_active() {
        return Err(Error::SurveyClosed);
    }

    // Token resolution wins when both a token and an email are supplied.
    let recipient_email = if let Some(token) = request.token.as_deref().filter(|t| !t.is_empty()) {
        let recipient = state
            .store
            .get_recipient_by_token(survey.id, token)
            .await?
            .ok_or(Error::InvalidToken)?;
        recipient.email
    } else if let Some(email) = request.email.as_deref().filter(|e| !e.is_empty()) {
        if !is_valid_email(email) {
            return Err(Error::InvalidRequest(format!("invalid email: {email}")));
        }
        email.to_string()
    } else {
        return Err(Error::InvalidRequest(
            "either a response token or an email is required".to_string(),
        ));
    };

    if state.store.has_response(survey.id, &recipient_email).await? {
        return Err(Error::AlreadyResponded);
    }

    let inserted = state
        .store
        .insert_response(NewResponse {
            survey_id: survey.id,
            recipient_email,
            answer,
            answered_at: Utc::now(),
        })
        .await?;
    if !inserted {
        // Lost the duplicate race to a concurrent response.
        return Err(Error::AlreadyResponded);
    }

    info!(survey_id = %survey.id, answer = %answer, "response recorded");
    Ok(())
}

// ============================================================================
// Delete Survey
// ============================================================================

/// Owner-initiated survey deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSurveyRequest {
    /// Survey id.
    pub survey_id: Uuid,
    /// Caller identity; must own the survey.
    pub owner_id: Uuid,
}

/// Delete a survey with its recipients, tasks and responses.
#[instrument(skip(state, request), fields(survey_id = %request.survey_id))]
pub async fn handle_delete_survey(
    state: &EngineState,
    request: DeleteSurveyRequest,
) -> Result<()> {
    let survey = state
        .store
        .get_survey_for_owner(request.survey_id, request.owner_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(request.survey_id.to_string()))?;

    state.store.delete_survey(survey.id).await?;
    info!(survey_id = %survey.id, "survey deleted");
    Ok(())
}

// ============================================================================
// Survey Results
// ============================================================================

/// Owner-scoped results fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResultsRequest {
    /// Survey id.
    pub survey_id: Uuid,
    /// Caller identity; must own the survey.
    pub owner_id: Uuid,
}

/// One recorded response in a results view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    /// Who responded; `None` for anonymous surveys.
    pub respondent_email: Option<String>,
    /// Answer value.
    pub answer: String,
    /// When the response was recorded.
    pub answered_at: DateTime<Utc>,
}

/// Aggregated and per-response results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResultsResponse {
    /// Survey id.
    pub survey_id: Uuid,
    /// Aggregated answer counts.
    pub results: AnswerTotals,
    /// Total recorded responses.
    pub total_responses: i64,
    /// Individual responses, oldest first.
    pub responses: Vec<ResponseInfo>,
}

/// Fetch detailed results for a survey the caller owns.
#[instrument(skip(state, request), fields(survey_id = %request.survey_id))]
pub async fn handle_survey_results(
    state: &EngineState,
    request: SurveyResultsRequest,
) -> Result<SurveyResultsResponse> {
    let survey = state
        .store
        .get_survey_for_owner(request.survey_id, request.owner_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(request.survey_id.to_string()))?;
    let survey = lifecycle::close_if_expired(state, survey).await?;

    let responses = state.store.list_responses(survey.id).await?;
    let results = AnswerTotals::tally(&responses);

    let responses: Vec<ResponseInfo> = responses
        .into_iter()
        .map(|response| ResponseInfo {
            respondent_email: if survey.is_anonymous {
                None
            } else {
                Some(response.recipient_email)
            },
            answer: response.answer,
            answered_at: response.answered_at,
        })
        .collect();

    Ok(SurveyResultsResponse {
        survey_id: survey.id,
        results,
        total_responses: results.total(),
        responses,
    })
}
