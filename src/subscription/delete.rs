//! Endpoint for deleting subscriptions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error, UserID,
    cancellation::CancellationWorkflow,
    subscription::{delete_subscription, domain::SubscriptionIdData, parse_subscription_id},
};

#[derive(Debug, Clone)]
pub struct DeleteSubscriptionState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub cancellations: CancellationWorkflow,
}

impl FromRef<AppState> for DeleteSubscriptionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cancellations: state.cancellations.clone(),
        }
    }
}

pub async fn delete_subscription_endpoint(
    State(state): State<DeleteSubscriptionState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<SubscriptionIdData>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let Json(data) = payload?;
    let subscription_id = parse_subscription_id(data.id)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_subscription(subscription_id, user_id, &connection)?;
    state.cancellations.clear_failure(subscription_id);

    Ok(Json(json!({ "message": "Subscription deleted successfully" })))
}
