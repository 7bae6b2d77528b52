// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Survey lifecycle evaluation.
//!
//! Surveys move ACTIVE -> CLOSED exactly once, either when a read observes
//! the end date in the past or on an explicit terminate. There is no
//! scheduler; every read path runs the expiry check, so the transition has
//! happened by the time any reader observes the survey.

use chrono::{DateTime, Utc};
use tracing::info;

use opinari_core::{SurveyRecord, SurveyStatus, SurveyStore};

use crate::error::Result;
use crate::handlers::EngineState;
use crate::launcher;

/// Whether the survey's deadline has passed while it is still ACTIVE.
pub fn is_expired(survey: &SurveyRecord, now: DateTime<Utc>) -> bool {
    survey.is_active() && survey.end_date <= now
}

/// Run the lazy expiry check against a freshly loaded survey.
///
/// The close is a compare-and-set on ACTIVE, so when several readers race
/// past the deadline only the winner fires the ended notification; the
/// others re-read the already-closed row.
pub async fn close_if_expired(state: &EngineState, survey: SurveyRecord) -> Result<SurveyRecord> {
    let now = Utc::now();
    if !is_expired(&survey, now) {
        return Ok(survey);
    }

    if state.store.close_survey_if_active(survey.id, now).await? {
        info!(survey_id = %survey.id, end_date = %survey.end_date, "survey reached its end date, closing");
        launcher::spawn_ended_notification(state.clone(), survey.id);

        let mut closed = survey;
        closed.status = SurveyStatus::Closed.as_str().to_string();
        closed.updated_at = now;
        Ok(closed)
    } else {
        // Another reader closed it first; reflect what the store has now.
        let refreshed = state.store.get_survey(survey.id).await?;
        Ok(refreshed.unwrap_or(survey))
    }
}
