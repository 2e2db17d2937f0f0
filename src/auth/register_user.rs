//! Handles sign-up requests.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::{PasswordHash, UserID, Username, ValidatedPassword, create_user},
};

/// The state needed to register a user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost used to hash new passwords.
    pub password_hash_cost: u32,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_hash_cost: PasswordHash::DEFAULT_COST,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

/// The public details of a newly registered user.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: UserID,
    pub username: Username,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create a user from a username and password.
///
/// The user is not logged in, the client must call the log-in endpoint next.
///
/// # Errors
///
/// Returns:
/// - [Error::EmptyUsername] or [Error::TooWeak] for invalid input.
/// - [Error::DuplicateUsername] if the username is taken.
/// - [Error::HashingError] if the password could not be hashed.
pub async fn register_user(
    State(state): State<RegistrationState>,
    payload: Result<Json<RegisterForm>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisteredUser>), Error> {
    let Json(user_data) = payload?;

    let username = Username::new(&user_data.username)?;
    let validated_password = ValidatedPassword::new(&user_data.password)?;
    let password_hash = PasswordHash::new(validated_password, state.password_hash_cost)
        .inspect_err(|error| tracing::error!("an error occurred while hashing a password: {error}"))?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;
    let user = create_user(username, password_hash, &connection)?;

    tracing::info!("Registered user {} with ID {}", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }),
    ))
}
