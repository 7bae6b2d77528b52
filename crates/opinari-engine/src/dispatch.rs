// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Invitation dispatch engine.
//!
//! A dispatch run re-arms FAILED tasks, loads everything PENDING and drives
//! each task through a single transport attempt. Every status transition is
//! persisted immediately through a compare-and-set in the store, so a crash
//! mid-run leaves at most the in-flight task ambiguous and overlapping runs
//! never double-send.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use opinari_core::{EmailTaskStatus, SurveyStore};

use crate::email;
use crate::error::{Error, Result};
use crate::handlers::EngineState;

/// What a single dispatch run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// FAILED tasks re-armed to PENDING before the run.
    pub reset: u64,
    /// Tasks that reached SENT.
    pub sent: u64,
    /// Tasks that reached FAILED.
    pub failed: u64,
    /// Tasks left untouched (missing recipient row, or a concurrent run
    /// finalized the task first).
    pub skipped: u64,
}

/// Run one invitation dispatch pass over a survey.
///
/// Idempotent and safely re-entrant: with no new FAILED tasks a repeat run
/// finds nothing PENDING and does no transport work. One task's failure
/// never aborts the rest of the run.
pub async fn run_dispatch(state: &EngineState, survey_id: Uuid) -> Result<DispatchOutcome> {
    let survey = state
        .store
        .get_survey(survey_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(survey_id.to_string()))?;

    if survey.is_closed() {
        info!(survey_id = %survey_id, "survey is closed, skipping invitation dispatch");
        return Ok(DispatchOutcome::default());
    }

    let mut outcome = DispatchOutcome::default();

    outcome.reset = state.store.reset_failed_email_tasks(survey_id).await?;
    if outcome.reset > 0 {
        info!(survey_id = %survey_id, reset = outcome.reset, "re-armed failed email tasks");
    }

    let tasks = state
        .store
        .list_email_tasks(survey_id, Some(EmailTaskStatus::Pending))
        .await?;
    info!(survey_id = %survey_id, pending = tasks.len(), "starting invitation dispatch");

    let subject = email::invite_subject(&survey.name);
    for task in tasks {
        let recipient = match state
            .store
            .get_recipient_by_email(survey_id, &task.recipient_email)
            .await?
        {
            Some(recipient) => recipient,
            None => {
                // Task without a recipient row; leave it PENDING.
                info!(
                    survey_id = %survey_id,
                    recipient = %task.recipient_email,
                    "no recipient found for email task, skipping"
                );
                outcome.skipped += 1;
                continue;
            }
        };

        let body = email::render_invite(&state.web_origin, &survey, &recipient.response_token);

        match state
            .mailer
            .send(&task.recipient_email, &subject, &body)
            .await
        {
            Ok(()) => {
                if state.store.mark_email_task_sent(task.id, Utc::now()).await? {
                    outcome.sent += 1;
                } else {
                    // A concurrent run already finalized this task.
                    outcome.skipped += 1;
                }
            }
            Err(e) => {
                warn!(
                    survey_id = %survey_id,
                    recipient = %task.recipient_email,
                    error = %e,
                    "invitation send failed"
                );
                if state.store.mark_email_task_failed(task.id).await? {
                    outcome.failed += 1;
                } else {
                    outcome.skipped += 1;
                }
            }
        }
    }

    info!(
        survey_id = %survey_id,
        sent = outcome.sent,
        failed = outcome.failed,
        skipped = outcome.skipped,
        "invitation dispatch finished"
    );
    Ok(outcome)
}

/// Send the "survey ended" notice to every recipient of a closed survey.
///
/// One attempt per recipient and nothing is persisted; a failed send is
/// logged and swallowed so the remaining recipients are still notified.
pub async fn send_survey_ended_emails(state: &EngineState, survey_id: Uuid) -> Result<()> {
    let survey = state
        .store
        .get_survey(survey_id)
        .await?
        .ok_or_else(|| Error::SurveyNotFound(survey_id.to_string()))?;

    if !survey.is_closed() {
        info!(survey_id = %survey_id, "survey is still active, skipping ended notification");
        return Ok(());
    }

    let recipients = state.store.list_recipients(survey_id).await?;
    info!(
        survey_id = %survey_id,
        recipients = recipients.len(),
        "sending survey ended notification"
    );

    let subject = email::ended_subject(&survey.name);
    let body = email::render_ended(&survey.name);

    for recipient in recipients {
        if let Err(e) = state.mailer.send(&recipient.email, &subject, &body).await {
            warn!(
                survey_id = %survey_id,
                recipient = %recipient.email,
                error = %e,
                "survey ended notice failed"
            );
        }
    }

    Ok(())
}
