//! Endpoint for deleting categories.

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
    category::{delete_category, domain::CategoryIdData, parse_category_id},
    subscription::list_subscriptions_by_category,
};

#[derive(Debug, Clone)]
pub struct DeleteCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub cancellations: CancellationWorkflow,
}

impl FromRef<AppState> for DeleteCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cancellations: state.cancellations.clone(),
        }
    }
}

/// Delete one of the logged in user's categories along with its subscriptions.
pub async fn delete_category_endpoint(
    State(state): State<DeleteCategoryState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<CategoryIdData>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let Json(data) = payload?;
    let category_id = parse_category_id(data.id)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let subscriptions = list_subscriptions_by_category(category_id, user_id, &connection)?;
    delete_category(category_id, user_id, &connection)?;

    for subscription in subscriptions {
        state.cancellations.clear_failure(subscription.id);
    }

    tracing::info!("Deleted category {category_id} for user {user_id}");

    Ok(Json(json!({ "message": "Category deleted successfully" })))
}
