//! Endpoint for listing the subscriptions in a category.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    category::parse_category_id,
    subscription::{Subscription, list_subscriptions_by_category},
};

#[derive(Debug, Clone)]
pub struct ListSubscriptionsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListSubscriptionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The subscriptions in one of the logged in user's categories, newest first.
pub async fn list_category_subscriptions_endpoint(
    State(state): State<ListSubscriptionsState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<i64>,
) -> Result<Json<Vec<Subscription>>, Error> {
    let category_id = parse_category_id(category_id)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    list_subscriptions_by_category(category_id, user_id, &connection).map(Json)
}
