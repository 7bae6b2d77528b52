// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for opinari-engine integration tests.
//!
//! Builds an [`EngineState`] over a file-backed SQLite store and a mock
//! mailer, so every engine path runs without PostgreSQL or a provider.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use opinari_core::token::generate_response_token;
use opinari_core::{NewRecipient, NewSurvey, SqliteStore, SurveyStore};
use opinari_engine::handlers::EngineState;
use opinari_engine::mailer::MockMailer;

/// Base origin used in tests; answer links embed it.
pub const TEST_ORIGIN: &str = "http://localhost:5173";

/// Test context bundling engine state, the mock mailer and a raw pool
/// handle for fixture surgery.
pub struct TestContext {
    pub state: EngineState,
    pub mailer: Arc<MockMailer>,
    pub pool: SqlitePool,
    _temp_dir: tempfile::TempDir,
}

impl TestContext {
    /// Create a fresh context with its own database file.
    pub async fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("engine-test.db");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{}?mode=rwc", db_path.display()))
            .await
            .expect("Failed to open SQLite database");
        opinari_core::migrations::run_sqlite(&pool)
            .await
            .expect("Failed to run migrations");

        let mailer = Arc::new(MockMailer::new());
        let store: Arc<dyn SurveyStore> = Arc::new(SqliteStore::new(pool.clone()));
        let state = EngineState::new(store, mailer.clone(), TEST_ORIGIN);

        Self {
            state,
            mailer,
            pool,
            _temp_dir: temp_dir,
        }
    }
}

/// A survey closing in a week, owned by `owner_id`.
pub fn new_survey(owner_id: Uuid, name: &str, recipients: &[&str]) -> NewSurvey {
    survey_with_end_date(owner_id, name, recipients, Utc::now() + chrono::Duration::days(7))
}

/// A survey whose deadline has already passed.
pub fn expired_survey(owner_id: Uuid, name: &str, recipients: &[&str]) -> NewSurvey {
    survey_with_end_date(owner_id, name, recipients, Utc::now() - chrono::Duration::hours(1))
}

fn survey_with_end_date(
    owner_id: Uuid,
    name: &str,
    recipients: &[&str],
    end_date: DateTime<Utc>,
) -> NewSurvey {
    NewSurvey {
        name: name.to_string(),
        question: "Are we shipping fast enough?".to_string(),
        end_date,
        is_anonymous: false,
        owner_id,
        recipients: recipients
            .iter()
            .map(|email| NewRecipient {
                email: email.to_string(),
                response_token: generate_response_token(),
            })
            .collect(),
    }
}

/// Wait until a detached dispatch run has driven every task to SENT.
///
/// Polls FAILED as well as PENDING because a detached run re-arms FAILED
/// tasks itself; a FAILED task may not have become PENDING yet when the
/// run was only just spawned. Tasks left PENDING on purpose (missing
/// recipient rows) never settle, so tests exercising that path must not
/// use this helper.
pub async fn settle_dispatch(ctx: &TestContext, survey_id: Uuid) {
    for _ in 0..200 {
        let counts = ctx
            .state
            .store
            .email_task_counts(survey_id)
            .await
            .expect("Failed to count tasks");
        if counts.pending == 0 && counts.failed == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("dispatch did not settle for survey {survey_id}");
}

/// Wait until the mock mailer has recorded at least `count` sends.
pub async fn wait_for_sent(ctx: &TestContext, count: usize) {
    for _ in 0..200 {
        if ctx.mailer.sent_count().await >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected at least {count} sent emails, saw {}",
        ctx.mailer.sent_count().await
    );
}
