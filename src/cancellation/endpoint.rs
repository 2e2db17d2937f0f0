//! Endpoints for starting a cancellation and checking on its progress.

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, UserID,
    cancellation::{CancellationStatus, CancellationWorkflow},
    subscription::parse_subscription_id,
};

#[derive(Debug, Clone)]
pub struct CancellationEndpointState {
    pub cancellations: CancellationWorkflow,
}

impl FromRef<AppState> for CancellationEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cancellations: state.cancellations.clone(),
        }
    }
}

/// The request body for starting a cancellation.
///
/// The client must send `{"confirm": true}` after asking the user.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfirmCancellationData {
    #[serde(default)]
    pub confirm: bool,
}

/// Start cancelling one of the logged in user's subscriptions.
///
/// Responds with 202 Accepted and the `processing` status. The cancellation is
/// saved once the grace period has passed.
pub async fn confirm_cancellation_endpoint(
    State(state): State<CancellationEndpointState>,
    Extension(user_id): Extension<UserID>,
    Path(subscription_id): Path<i64>,
    payload: Result<Json<ConfirmCancellationData>, JsonRejection>,
) -> Result<(StatusCode, Json<CancellationStatus>), Error> {
    let subscription_id = parse_subscription_id(subscription_id)?;
    let Json(data) = payload?;

    let status = state
        .cancellations
        .confirm(subscription_id, user_id, data.confirm)?;

    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// The cancellation state of one of the logged in user's subscriptions.
pub async fn get_cancellation_status_endpoint(
    State(state): State<CancellationEndpointState>,
    Extension(user_id): Extension<UserID>,
    Path(subscription_id): Path<i64>,
) -> Result<Json<CancellationStatus>, Error> {
    let subscription_id = parse_subscription_id(subscription_id)?;

    state
        .cancellations
        .status(subscription_id, user_id)
        .map(Json)
}
