// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the invitation dispatch engine and ended notifications.

mod common;

use chrono::Utc;
use uuid::Uuid;

use common::{TestContext, expired_survey, new_survey};
use opinari_core::{EmailTaskStatus, SurveyStore};
use opinari_engine::Error;
use opinari_engine::dispatch::{DispatchOutcome, run_dispatch, send_survey_ended_emails};

#[tokio::test]
async fn test_dispatch_missing_survey_errors() {
    let ctx = TestContext::new().await;

    let result = run_dispatch(&ctx.state, Uuid::new_v4()).await;

    assert!(matches!(result, Err(Error::SurveyNotFound(_))));
}

#[tokio::test]
async fn test_dispatch_closed_survey_is_noop() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(Uuid::new_v4(), "Pulse", &["a@example.com"]))
        .await
        .expect("Create should succeed");
    ctx.state
        .store
        .close_survey_if_active(survey.id, Utc::now())
        .await
        .expect("Close should succeed");

    let outcome = run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Dispatch should succeed");

    assert_eq!(outcome, DispatchOutcome::default());
    assert_eq!(ctx.mailer.sent_count().await, 0);
}

#[tokio::test]
async fn test_dispatch_sends_every_pending_invitation() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(
            Uuid::new_v4(),
            "Pulse",
            &["a@example.com", "b@example.com", "c@example.com"],
        ))
        .await
        .expect("Create should succeed");

    let outcome = run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Dispatch should succeed");

    assert_eq!(
        outcome,
        DispatchOutcome {
            reset: 0,
            sent: 3,
            failed: 0,
            skipped: 0
        }
    );

    let tasks = ctx
        .state
        .store
        .list_email_tasks(survey.id, None)
        .await
        .expect("List should succeed");
    assert_eq!(tasks.len(), 3);
    assert!(tasks.iter().all(|t| t.status == "SENT"));
    assert!(tasks.iter().all(|t| t.sent_at.is_some()));

    let sent = ctx.mailer.sent().await;
    assert_eq!(sent.len(), 3);
    assert!(
        sent.iter()
            .all(|email| email.subject == "You're invited to participate in the survey: Pulse")
    );
    assert!(ctx.mailer.sent_to("b@example.com").await);
}

#[tokio::test]
async fn test_dispatch_embeds_recipient_token_in_invitation() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(Uuid::new_v4(), "Pulse", &["a@example.com"]))
        .await
        .expect("Create should succeed");

    run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Dispatch should succeed");

    let recipient = ctx
        .state
        .store
        .get_recipient_by_email(survey.id, "a@example.com")
        .await
        .expect("Lookup should succeed")
        .expect("Recipient should exist");

    let sent = ctx.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains(&survey.question));
    assert!(
        sent[0]
            .body
            .contains(&format!("token={}", recipient.response_token))
    );
}

#[tokio::test]
async fn test_dispatch_failure_is_isolated_and_retry_converges() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(
            Uuid::new_v4(),
            "Pulse",
            &["a@example.com", "b@example.com", "c@example.com"],
        ))
        .await
        .expect("Create should succeed");
    ctx.mailer.fail_for("b@example.com").await;

    let outcome = run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Dispatch should succeed");

    assert_eq!(outcome.sent, 2);
    assert_eq!(outcome.failed, 1);

    let counts = ctx
        .state
        .store
        .email_task_counts(survey.id)
        .await
        .expect("Counts should succeed");
    assert_eq!(counts.sent, 2);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.pending, 0);

    // Provider recovers; the retry run re-arms only the failed task.
    ctx.mailer.recover("b@example.com").await;
    let retry = run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Retry dispatch should succeed");

    assert_eq!(
        retry,
        DispatchOutcome {
            reset: 1,
            sent: 1,
            failed: 0,
            skipped: 0
        }
    );

    let counts = ctx
        .state
        .store
        .email_task_counts(survey.id)
        .await
        .expect("Counts should succeed");
    assert_eq!(counts.sent, 3);
    assert_eq!(counts.failed, 0);
}

#[tokio::test]
async fn test_dispatch_is_idempotent() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(
            Uuid::new_v4(),
            "Pulse",
            &["a@example.com", "b@example.com"],
        ))
        .await
        .expect("Create should succeed");

    let first = run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Dispatch should succeed");
    assert_eq!(first.sent, 2);

    // No new FAILED tasks, so a repeat run finds nothing to do.
    let second = run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Dispatch should succeed");
    assert_eq!(second, DispatchOutcome::default());
    assert_eq!(ctx.mailer.sent_count().await, 2);
}

#[tokio::test]
async fn test_dispatch_skips_task_without_recipient() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(
            Uuid::new_v4(),
            "Pulse",
            &["a@example.com", "b@example.com"],
        ))
        .await
        .expect("Create should succeed");

    // Orphan one task by removing its recipient row.
    sqlx::query("DELETE FROM recipients WHERE survey_id = ? AND email = ?")
        .bind(survey.id)
        .bind("b@example.com")
        .execute(&ctx.pool)
        .await
        .expect("Fixture delete should succeed");

    let outcome = run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Dispatch should succeed");

    assert_eq!(outcome.sent, 1);
    assert_eq!(outcome.skipped, 1);

    // The orphaned task stays PENDING rather than being failed.
    let pending = ctx
        .state
        .store
        .list_email_tasks(survey.id, Some(EmailTaskStatus::Pending))
        .await
        .expect("List should succeed");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].recipient_email, "b@example.com");
    assert!(!ctx.mailer.sent_to("b@example.com").await);
}

#[tokio::test]
async fn test_ended_emails_missing_survey_errors() {
    let ctx = TestContext::new().await;

    let result = send_survey_ended_emails(&ctx.state, Uuid::new_v4()).await;

    assert!(matches!(result, Err(Error::SurveyNotFound(_))));
}

#[tokio::test]
async fn test_ended_emails_require_closed_survey() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(Uuid::new_v4(), "Pulse", &["a@example.com"]))
        .await
        .expect("Create should succeed");

    send_survey_ended_emails(&ctx.state, survey.id)
        .await
        .expect("Should be a no-op on an active survey");

    assert_eq!(ctx.mailer.sent_count().await, 0);
}

#[tokio::test]
async fn test_ended_emails_notify_every_recipient() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(
            Uuid::new_v4(),
            "Quarterly check",
            &["a@example.com", "b@example.com"],
        ))
        .await
        .expect("Create should succeed");
    ctx.state
        .store
        .close_survey_if_active(survey.id, Utc::now())
        .await
        .expect("Close should succeed");

    send_survey_ended_emails(&ctx.state, survey.id)
        .await
        .expect("Ended notification should succeed");

    let sent = ctx.mailer.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(
        sent.iter()
            .all(|email| email.subject == "Survey 'Quarterly check' has ended")
    );
    assert!(ctx.mailer.sent_to("a@example.com").await);
    assert!(ctx.mailer.sent_to("b@example.com").await);
}

#[tokio::test]
async fn test_ended_emails_swallow_per_recipient_failures() {
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(new_survey(
            Uuid::new_v4(),
            "Pulse",
            &["a@example.com", "b@example.com", "c@example.com"],
        ))
        .await
        .expect("Create should succeed");
    ctx.state
        .store
        .close_survey_if_active(survey.id, Utc::now())
        .await
        .expect("Close should succeed");
    ctx.mailer.fail_for("b@example.com").await;

    send_survey_ended_emails(&ctx.state, survey.id)
        .await
        .expect("A failing recipient must not abort the run");

    assert_eq!(ctx.mailer.sent_count().await, 2);
    assert!(ctx.mailer.sent_to("a@example.com").await);
    assert!(ctx.mailer.sent_to("c@example.com").await);
}

#[tokio::test]
async fn test_dispatch_does_not_run_on_expired_status_alone() {
    // An expired survey that nobody has read yet is still ACTIVE in the
    // store, and dispatch only consults the stored status.
    let ctx = TestContext::new().await;
    let survey = ctx
        .state
        .store
        .create_survey(expired_survey(Uuid::new_v4(), "Late", &["a@example.com"]))
        .await
        .expect("Create should succeed");

    let outcome = run_dispatch(&ctx.state, survey.id)
        .await
        .expect("Dispatch should succeed");

    assert_eq!(outcome.sent, 1);
}
