// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed survey store.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use crate::error::StoreError;

use super::{
    EmailTaskCounts, EmailTaskRecord, EmailTaskStatus, ListSurveysFilter, NewResponse, NewSurvey,
    RecipientRecord, ResponseRecord, SurveyRecord, SurveyStatus, SurveyStore, fold_task_counts,
};

/// SQLite-backed store implementation.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite-backed store from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a SQLite store from a file path.
    ///
    /// This convenience constructor handles all setup:
    /// - Creates parent directories if they don't exist
    /// - Creates the database file if it doesn't exist
    /// - Connects with sensible defaults
    /// - Runs all migrations
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = SqliteStore::from_path(".data/opinari.db").await?;
    /// ```
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        crate::migrations::run_sqlite(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl SurveyStore for SqliteStore {
    async fn create_survey(&self, survey: NewSurvey) -> Result<SurveyRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let survey_id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO surveys (id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'ACTIVE', ?7, ?7)
            "#,
        )
        .bind(survey_id)
        .bind(&survey.name)
        .bind(&survey.question)
        .bind(survey.end_date)
        .bind(survey.is_anonymous)
        .bind(survey.owner_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for recipient in &survey.recipients {
            sqlx::query(
                r#"
                INSERT INTO recipients (id, survey_id, email, response_token, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(survey_id)
            .bind(&recipient.email)
            .bind(&recipient.response_token)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO email_tasks (id, survey_id, recipient_email, status, created_at)
                VALUES (?, ?, ?, 'PENDING', ?)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(survey_id)
            .bind(&recipient.email)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(SurveyRecord {
            id: survey_id,
            name: survey.name,
            question: survey.question,
            end_date: survey.end_date,
            is_anonymous: survey.is_anonymous,
            owner_id: survey.owner_id,
            status: SurveyStatus::Active.as_str().to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_survey(&self, survey_id: Uuid) -> Result<Option<SurveyRecord>, StoreError> {
        let record = sqlx::query_as::<_, SurveyRecord>(
            r#"
            SELECT id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at
            FROM surveys
            WHERE id = ?
            "#,
        )
        .bind(survey_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_survey_for_owner(
        &self,
        survey_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<SurveyRecord>, StoreError> {
        let record = sqlx::query_as::<_, SurveyRecord>(
            r#"
            SELECT id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at
            FROM surveys
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(survey_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_surveys(
        &self,
        owner_id: Uuid,
        filter: &ListSurveysFilter,
    ) -> Result<Vec<SurveyRecord>, StoreError> {
        let records = sqlx::query_as::<_, SurveyRecord>(
            r#"
            SELECT id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at
            FROM surveys
            WHERE owner_id = ?1
              AND (?2 IS NULL OR name LIKE '%' || ?2 || '%')
            ORDER BY created_at DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(owner_id)
        .bind(filter.name_contains.as_deref())
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn count_surveys(
        &self,
        owner_id: Uuid,
        name_contains: Option<&str>,
    ) -> Result<i64, StoreError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM surveys
            WHERE owner_id = ?1
              AND (?2 IS NULL OR name LIKE '%' || ?2 || '%')
            "#,
        )
        .bind(owner_id)
        .bind(name_contains)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn close_survey_if_active(
        &self,
        survey_id: Uuid,
        closed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE surveys
            SET status = 'CLOSED', updated_at = ?2
            WHERE id = ?1 AND status = 'ACTIVE'
            "#,
        )
        .bind(survey_id)
        .bind(closed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_survey(&self, survey_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM surveys
            WHERE id = ?
            "#,
        )
        .bind(survey_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_recipients(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<RecipientRecord>, StoreError> {
        let records = sqlx::query_as::<_, RecipientRecord>(
            r#"
            SELECT id, survey_id, email, response_token, created_at
            FROM recipients
            WHERE survey_id = ?
            ORDER BY email ASC
            "#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get_recipient_by_token(
        &self,
        survey_id: Uuid,
        response_token: &str,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        let record = sqlx::query_as::<_, RecipientRecord>(
            r#"
            SELECT id, survey_id, email, response_token, created_at
            FROM recipients
            WHERE survey_id = ? AND response_token = ?
            "#,
        )
        .bind(survey_id)
        .bind(response_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_recipient_by_email(
        &self,
        survey_id: Uuid,
        email: &str,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        let record = sqlx::query_as::<_, RecipientRecord>(
            r#"
            SELECT id, survey_id, email, response_token, created_at
            FROM recipients
            WHERE survey_id = ? AND email = ?
            "#,
        )
        .bind(survey_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_email_tasks(
        &self,
        survey_id: Uuid,
        status: Option<EmailTaskStatus>,
    ) -> Result<Vec<EmailTaskRecord>, StoreError> {
        let records = sqlx::query_as::<_, EmailTaskRecord>(
            r#"
            SELECT id, survey_id, recipient_email, status, sent_at, created_at
            FROM email_tasks
            WHERE survey_id = ?1
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at ASC, recipient_email ASC
            "#,
        )
        .bind(survey_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn reset_failed_email_tasks(&self, survey_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE email_tasks
            SET status = 'PENDING'
            WHERE survey_id = ? AND status = 'FAILED'
            "#,
        )
        .bind(survey_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_email_task_sent(
        &self,
        task_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE email_tasks
            SET status = 'SENT', sent_at = ?2
            WHERE id = ?1 AND status = 'PENDING'
            "#,
        )
        .bind(task_id)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_email_task_failed(&self, task_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE email_tasks
            SET status = 'FAILED'
            WHERE id = ? AND status = 'PENDING'
            "#,
        )
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn email_task_counts(&self, survey_id: Uuid) -> Result<EmailTaskCounts, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM email_tasks
            WHERE survey_id = ?
            GROUP BY status
            "#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_task_counts(rows))
    }

    async fn insert_response(&self, response: NewResponse) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO survey_responses (id, survey_id, recipient_email, answer, answered_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(response.survey_id)
        .bind(&response.recipient_email)
        .bind(response.answer.as_str())
        .bind(response.answered_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_response(&self, survey_id: Uuid, email: &str) -> Result<bool, StoreError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM survey_responses
            WHERE survey_id = ? AND recipient_email = ?
            "#,
        )
        .bind(survey_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    async fn list_responses(&self, survey_id: Uuid) -> Result<Vec<ResponseRecord>, StoreError> {
        let records = sqlx::query_as::<_, ResponseRecord>(
            r#"
            SELECT id, survey_id, recipient_email, answer, answered_at
            FROM survey_responses
            WHERE survey_id = ?
            ORDER BY answered_at ASC, recipient_email ASC
            "#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
