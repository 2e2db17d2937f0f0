//! Endpoint for creating categories.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    category::{Category, CategoryName, create_category, domain::CategoryFormData},
};

#[derive(Debug, Clone)]
pub struct CreateCategoryEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Create a category for the logged in user.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryEndpointState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<CategoryFormData>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let Json(new_category) = payload?;
    let name = CategoryName::new(&new_category.name)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let category = create_category(name, user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(category)))
}
