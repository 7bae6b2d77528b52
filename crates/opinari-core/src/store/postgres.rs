// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed survey store.
//!
//! Provides all durable storage access functions for surveys, recipients,
//! email tasks, and responses.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;

use super::{
    EmailTaskCounts, EmailTaskRecord, EmailTaskStatus, ListSurveysFilter, NewResponse, NewSurvey,
    RecipientRecord, ResponseRecord, SurveyRecord, SurveyStore, fold_task_counts,
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new Postgres-backed store from an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Survey Operations
// ============================================================================

/// Create a survey with its recipients and one PENDING email task per
/// recipient, all in one transaction.
pub async fn create_survey(pool: &PgPool, survey: NewSurvey) -> Result<SurveyRecord, StoreError> {
    let mut tx = pool.begin().await?;

    let survey_id = Uuid::new_v4();
    let now = Utc::now();

    let record = sqlx::query_as::<_, SurveyRecord>(
        r#"
        INSERT INTO surveys (id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'ACTIVE', $7, $7)
        RETURNING id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at
        "#,
    )
    .bind(survey_id)
    .bind(&survey.name)
    .bind(&survey.question)
    .bind(survey.end_date)
    .bind(survey.is_anonymous)
    .bind(survey.owner_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    for recipient in &survey.recipients {
        sqlx::query(
            r#"
            INSERT INTO recipients (id, survey_id, email, response_token, created_at)
            VALUES ($1, $2, $3, $4, $5)
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
            VALUES ($1, $2, $3, 'PENDING', $4)
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

    Ok(record)
}

/// Get a survey by ID.
pub async fn get_survey(
    pool: &PgPool,
    survey_id: Uuid,
) -> Result<Option<SurveyRecord>, StoreError> {
    let record = sqlx::query_as::<_, SurveyRecord>(
        r#"
        SELECT id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at
        FROM surveys
        WHERE id = $1
        "#,
    )
    .bind(survey_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Fetch a survey by id scoped to an owner. The owner filter lives in the
/// query itself so an unauthorized id never reads differently from an
/// unknown one.
pub async fn get_survey_for_owner(
    pool: &PgPool,
    survey_id: Uuid,
    owner_id: Uuid,
) -> Result<Option<SurveyRecord>, StoreError> {
    let record = sqlx::query_as::<_, SurveyRecord>(
        r#"
        SELECT id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at
        FROM surveys
        WHERE id = $1 AND owner_id = $2
        "#,
    )
    .bind(survey_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// List an owner's surveys, newest first, with an optional name filter.
pub async fn list_surveys(
    pool: &PgPool,
    owner_id: Uuid,
    filter: &ListSurveysFilter,
) -> Result<Vec<SurveyRecord>, StoreError> {
    let records = sqlx::query_as::<_, SurveyRecord>(
        r#"
        SELECT id, name, question, end_date, is_anonymous, owner_id, status, created_at, updated_at
        FROM surveys
        WHERE owner_id = $1
          AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(owner_id)
    .bind(filter.name_contains.as_deref())
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Count an owner's surveys matching the optional name filter.
pub async fn count_surveys(
    pool: &PgPool,
    owner_id: Uuid,
    name_contains: Option<&str>,
) -> Result<i64, StoreError> {
    let count: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM surveys
        WHERE owner_id = $1
          AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
        "#,
    )
    .bind(owner_id)
    .bind(name_contains)
    .fetch_one(pool)
    .await?;

    Ok(count.0)
}

/// Close a survey only if it is still ACTIVE.
///
/// Returns `true` if the update was applied, `false` if the survey was
/// already CLOSED or missing.
pub async fn close_survey_if_active(
    pool: &PgPool,
    survey_id: Uuid,
    closed_at: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE surveys
        SET status = 'CLOSED', updated_at = $2
        WHERE id = $1 AND status = 'ACTIVE'
        "#,
    )
    .bind(survey_id)
    .bind(closed_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a survey; recipients, tasks and responses go with it via cascade.
pub async fn delete_survey(pool: &PgPool, survey_id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        DELETE FROM surveys
        WHERE id = $1
        "#,
    )
    .bind(survey_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Recipient Operations
// ============================================================================

/// List a survey's recipients.
pub async fn list_recipients(
    pool: &PgPool,
    survey_id: Uuid,
) -> Result<Vec<RecipientRecord>, StoreError> {
    let records = sqlx::query_as::<_, RecipientRecord>(
        r#"
        SELECT id, survey_id, email, response_token, created_at
        FROM recipients
        WHERE survey_id = $1
        ORDER BY email ASC
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Look up a recipient by response token within one survey.
pub async fn get_recipient_by_token(
    pool: &PgPool,
    survey_id: Uuid,
    response_token: &str,
) -> Result<Option<RecipientRecord>, StoreError> {
    let record = sqlx::query_as::<_, RecipientRecord>(
        r#"
        SELECT id, survey_id, email, response_token, created_at
        FROM recipients
        WHERE survey_id = $1 AND response_token = $2
        "#,
    )
    .bind(survey_id)
    .bind(response_token)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Look up a recipient by email within one survey.
pub async fn get_recipient_by_email(
    pool: &PgPool,
    survey_id: Uuid,
    email: &str,
) -> Result<Option<RecipientRecord>, StoreError> {
    let record = sqlx::query_as::<_, RecipientRecord>(
        r#"
        SELECT id, survey_id, email, response_token, created_at
        FROM recipients
        WHERE survey_id = $1 AND email = $2
        "#,
    )
    .bind(survey_id)
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

// ============================================================================
// Email Task Operations
// ============================================================================

/// List a survey's email tasks, optionally filtered by status.
pub async fn list_email_tasks(
    pool: &PgPool,
    survey_id: Uuid,
    status: Option<EmailTaskStatus>,
) -> Result<Vec<EmailTaskRecord>, StoreError> {
    let records = sqlx::query_as::<_, EmailTaskRecord>(
        r#"
        SELECT id, survey_id, recipient_email, status, sent_at, created_at
        FROM email_tasks
        WHERE survey_id = $1
          AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at ASC, recipient_email ASC
        "#,
    )
    .bind(survey_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Re-arm FAILED tasks to PENDING; returns how many changed.
pub async fn reset_failed_email_tasks(pool: &PgPool, survey_id: Uuid) -> Result<u64, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE email_tasks
        SET status = 'PENDING'
        WHERE survey_id = $1 AND status = 'FAILED'
        "#,
    )
    .bind(survey_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Mark a task SENT only if it is still PENDING.
pub async fn mark_email_task_sent(
    pool: &PgPool,
    task_id: Uuid,
    sent_at: DateTime<Utc>,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE email_tasks
        SET status = 'SENT', sent_at = $2
        WHERE id = $1 AND status = 'PENDING'
        "#,
    )
    .bind(task_id)
    .bind(sent_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a task FAILED only if it is still PENDING.
pub async fn mark_email_task_failed(pool: &PgPool, task_id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE email_tasks
        SET status = 'FAILED'
        WHERE id = $1 AND status = 'PENDING'
        "#,
    )
    .bind(task_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Per-status task counts for one survey.
pub async fn email_task_counts(
    pool: &PgPool,
    survey_id: Uuid,
) -> Result<EmailTaskCounts, StoreError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*)
        FROM email_tasks
        WHERE survey_id = $1
        GROUP BY status
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    Ok(fold_task_counts(rows))
}

// ============================================================================
// Response Operations
// ============================================================================

/// Record a response unless one exists for the same (survey, email) pair.
///
/// The partial insert relies on the uniqueness constraint, so two racing
/// callers cannot both succeed.
pub async fn insert_response(pool: &PgPool, response: NewResponse) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO survey_responses (id, survey_id, recipient_email, answer, answered_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (survey_id, recipient_email) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(response.survey_id)
    .bind(&response.recipient_email)
    .bind(response.answer.as_str())
    .bind(response.answered_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Whether a response exists for the (survey, email) pair.
pub async fn has_response(
    pool: &PgPool,
    survey_id: Uuid,
    email: &str,
) -> Result<bool, StoreError> {
    let count: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM survey_responses
        WHERE survey_id = $1 AND recipient_email = $2
        "#,
    )
    .bind(survey_id)
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(count.0 > 0)
}

/// List a survey's responses, oldest first.
pub async fn list_responses(
    pool: &PgPool,
    survey_id: Uuid,
) -> Result<Vec<ResponseRecord>, StoreError> {
    let records = sqlx::query_as::<_, ResponseRecord>(
        r#"
        SELECT id, survey_id, recipient_email, answer, answered_at
        FROM survey_responses
        WHERE survey_id = $1
        ORDER BY answered_at ASC, recipient_email ASC
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

#[async_trait::async_trait]
impl SurveyStore for PostgresStore {
    async fn create_survey(&self, survey: NewSurvey) -> Result<SurveyRecord, StoreError> {
        create_survey(&self.pool, survey).await
    }

    async fn get_survey(&self, survey_id: Uuid) -> Result<Option<SurveyRecord>, StoreError> {
        get_survey(&self.pool, survey_id).await
    }

    async fn get_survey_for_owner(
        &self,
        survey_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<SurveyRecord>, StoreError> {
        get_survey_for_owner(&self.pool, survey_id, owner_id).await
    }

    async fn list_surveys(
        &self,
        owner_id: Uuid,
        filter: &ListSurveysFilter,
    ) -> Result<Vec<SurveyRecord>, StoreError> {
        list_surveys(&self.pool, owner_id, filter).await
    }

    async fn count_surveys(
        &self,
        owner_id: Uuid,
        name_contains: Option<&str>,
    ) -> Result<i64, StoreError> {
        count_surveys(&self.pool, owner_id, name_contains).await
    }

    async fn close_survey_if_active(
        &self,
        survey_id: Uuid,
        closed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        close_survey_if_active(&self.pool, survey_id, closed_at).await
    }

    async fn delete_survey(&self, survey_id: Uuid) -> Result<bool, StoreError> {
        delete_survey(&self.pool, survey_id).await
    }

    async fn list_recipients(
        &self,
        survey_id: Uuid,
    ) -> Result<Vec<RecipientRecord>, StoreError> {
        list_recipients(&self.pool, survey_id).await
    }

    async fn get_recipient_by_token(
        &self,
        survey_id: Uuid,
        response_token: &str,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        get_recipient_by_token(&self.pool, survey_id, response_token).await
    }

    async fn get_recipient_by_email(
        &self,
        survey_id: Uuid,
        email: &str,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        get_recipient_by_email(&self.pool, survey_id, email).await
    }

    async fn list_email_tasks(
        &self,
        survey_id: Uuid,
        status: Option<EmailTaskStatus>,
    ) -> Result<Vec<EmailTaskRecord>, StoreError> {
        list_email_tasks(&self.pool, survey_id, status).await
    }

    async fn reset_failed_email_tasks(&self, survey_id: Uuid) -> Result<u64, StoreError> {
        reset_failed_email_tasks(&self.pool, survey_id).await
    }

    async fn mark_email_task_sent(
        &self,
        task_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        mark_email_task_sent(&self.pool, task_id, sent_at).await
    }

    async fn mark_email_task_failed(&self, task_id: Uuid) -> Result<bool, StoreError> {
        mark_email_task_failed(&self.pool, task_id).await
    }

    async fn email_task_counts(&self, survey_id: Uuid) -> Result<EmailTaskCounts, StoreError> {
        email_task_counts(&self.pool, survey_id).await
    }

    async fn insert_response(&self, response: NewResponse) -> Result<bool, StoreError> {
        insert_response(&self.pool, response).await
    }

    async fn has_response(&self, survey_id: Uuid, email: &str) -> Result<bool, StoreError> {
        has_response(&self.pool, survey_id, email).await
    }

    async fn list_responses(&self, survey_id: Uuid) -> Result<Vec<ResponseRecord>, StoreError> {
        list_responses(&self.pool, survey_id).await
    }
}
