// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Detached execution of dispatch work.
//!
//! Handlers must return without waiting on transport I/O, so dispatch runs
//! are spawned onto the runtime. A spawned run owns a clone of the engine
//! state and outlives the request that triggered it; errors are logged and
//! never reach the caller.

use tracing::error;
use uuid::Uuid;

use crate::dispatch;
use crate::handlers::EngineState;

/// Spawn an invitation dispatch run for the survey.
///
/// Fire-and-forget: the caller cannot assume any task has been processed
/// when this returns. Overlapping runs for the same survey are safe because
/// task transitions are compare-and-set in the store.
pub fn spawn_dispatch(state: EngineState, survey_id: Uuid) {
    tokio::spawn(async move {
        if let Err(e) = dispatch::run_dispatch(&state, survey_id).await {
            error!(survey_id = %survey_id, error = %e, "detached dispatch run failed");
        }
    });
}

/// Spawn the best-effort "survey ended" notification run for the survey.
pub fn spawn_ended_notification(state: EngineState, survey_id: Uuid) {
    tokio::spawn(async move {
        if let Err(e) = dispatch::send_survey_ended_emails(&state, survey_id).await {
            error!(survey_id = %survey_id, error = %e, "survey ended notification run failed");
        }
    });
}
