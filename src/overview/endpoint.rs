//! Endpoint for the overview of a user's categories and subscriptions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    cancellation::CancellationWorkflow,
    category::list_categories,
    overview::{Overview, build_overview},
    subscription::list_subscriptions_for_user,
};

#[derive(Debug, Clone)]
pub struct OverviewState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub cancellations: CancellationWorkflow,
}

impl FromRef<AppState> for OverviewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cancellations: state.cancellations.clone(),
        }
    }
}

/// The logged in user's categories with their subscriptions, subtotals and grand total.
pub async fn get_overview_endpoint(
    State(state): State<OverviewState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Overview>, Error> {
    let (categories, subscriptions, processing) =
        state.cancellations.with_processing(user_id, |processing| {
            let connection = state.db_connection.lock().map_err(|error| {
                tracing::error!("could not acquire database lock: {error}");
                Error::DatabaseLockError
            })?;

            Ok::<_, Error>((
                list_categories(user_id, &connection)?,
                list_subscriptions_for_user(user_id, &connection)?,
                processing.clone(),
            ))
        })?;

    Ok(Json(build_overview(categories, subscriptions, &processing)))
}
