//! Endpoint for creating subscriptions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    subscription::{
        NewSubscription, Subscription, create_subscription, domain::SubscriptionFormData,
    },
};

#[derive(Debug, Clone)]
pub struct CreateSubscriptionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateSubscriptionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Create a subscription in one of the logged in user's categories.
///
/// The request is validated before the database is touched.
pub async fn create_subscription_endpoint(
    State(state): State<CreateSubscriptionState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<SubscriptionFormData>, JsonRejection>,
) -> Result<(StatusCode, Json<Subscription>), Error> {
    let Json(form) = payload?;
    let new_subscription = NewSubscription::try_from(form).inspect_err(|error| {
        tracing::warn!("Rejected subscription from user {user_id}: {error}");
    })?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let subscription = create_subscription(new_subscription, user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(subscription)))
}
