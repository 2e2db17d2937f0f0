//! Endpoint for setting or clearing a subscription's cancellation time directly.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error, UserID,
    cancellation::CancellationWorkflow,
    subscription::{
        domain::{CancellationFormData, parse_cancelled_at},
        parse_subscription_id, set_cancellation,
    },
};

#[derive(Debug, Clone)]
pub struct UpdateCancellationState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub cancellations: CancellationWorkflow,
}

impl FromRef<AppState> for UpdateCancellationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cancellations: state.cancellations.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancellationUpdated {
    pub message: &'static str,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cancelled_at: Option<OffsetDateTime>,
}

/// Cancel a subscription at the given time, or reactivate it when `cancelled_at` is null.
///
/// This skips the grace period of the cancellation workflow. A subscription
/// whose cancellation is `processing` is left to the workflow and the request
/// is refused with [Error::CancellationInProgress].
pub async fn update_cancellation_endpoint(
    State(state): State<UpdateCancellationState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<CancellationFormData>, JsonRejection>,
) -> Result<Json<CancellationUpdated>, Error> {
    let Json(form) = payload?;
    let subscription_id = parse_subscription_id(form.id)?;
    let cancelled_at = parse_cancelled_at(&form.cancelled_at)?;

    state.cancellations.with_processing(user_id, |processing| {
        if processing.contains(&subscription_id) {
            return Err(Error::CancellationInProgress);
        }

        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        set_cancellation(subscription_id, user_id, cancelled_at, &connection)
    })?;

    state.cancellations.clear_failure(subscription_id);

    let message = match cancelled_at {
        Some(_) => "Subscription cancelled successfully",
        None => "Subscription reactivated successfully",
    };

    Ok(Json(CancellationUpdated {
        message,
        cancelled_at,
    }))
}
