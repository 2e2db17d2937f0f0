//! Subtrack is a web service for keeping track of personal subscriptions.
//!
//! Users group their subscriptions into categories, see how much they spend per
//! category, and cancel subscriptions through a cancellation workflow that
//! waits for a grace period before the cancellation is written to the database.
//!
//! This library provides a JSON REST API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod cancellation;
mod category;
mod db;
mod endpoints;
mod logging;
mod not_found;
mod overview;
mod routing;
mod subscription;
#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    PasswordHash, User, UserID, Username, ValidatedPassword, create_user, get_user_by_username,
    update_password,
};
pub use cancellation::{
    CancellationEvent, CancellationState, CancellationStatus, CancellationStore,
    CancellationWorkflow, DEFAULT_GRACE_PERIOD, SQLiteCancellationStore,
};
pub use category::{Category, CategoryId, CategoryName, create_category};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use subscription::{
    BillingCycle, NewSubscription, RenewalDay, Subscription, SubscriptionId, SubscriptionName,
    create_subscription, set_cancellation,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username and password combination did not match a registered user.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The request did not carry a valid session.
    #[error("you must be logged in to do that")]
    Unauthorized,

    /// An empty string was used as a username.
    #[error("Username cannot be empty")]
    EmptyUsername,

    /// The username is already taken by another user.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The request body could not be parsed as the expected JSON object.
    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    /// An empty string was used as a category name.
    #[error("Invalid category name")]
    EmptyCategoryName,

    /// The category name already exists for the user.
    #[error("a category named \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// A category ID was not a positive integer.
    #[error("Invalid category ID")]
    InvalidCategoryId,

    /// An empty string was used as a subscription name.
    #[error("Invalid subscription name")]
    EmptySubscriptionName,

    /// A subscription ID was not a positive integer.
    #[error("Invalid subscription ID")]
    InvalidSubscriptionId,

    /// A subscription cost was negative or not a number.
    #[error("Invalid cost")]
    InvalidCost,

    /// The billing cycle was not one of `day`, `week`, `month` or `annual`.
    #[error("Invalid billing cycle \"{0}\"")]
    InvalidBillingCycle(String),

    /// The renewal day was outside of 1 to 31.
    #[error("Invalid renewal date {0}, must be a day of the month from 1 to 31")]
    InvalidRenewalDay(i64),

    /// The cancellation timestamp was neither a date-time string nor null.
    #[error("Invalid cancelled_at value")]
    InvalidCancelledAt,

    /// A cancellation was requested without the explicit confirmation.
    #[error("cancellation must be confirmed")]
    ConfirmationRequired,

    /// A cancellation is already waiting out its grace period.
    #[error("the subscription is already being cancelled")]
    CancellationInProgress,

    /// The subscription has already been cancelled.
    #[error("the subscription has already been cancelled")]
    AlreadyCancelled,

    /// The requested resource was not found.
    ///
    /// Resources owned by other users are reported as not found too, so that
    /// clients cannot tell whether other users' data exists.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while reading or writing the session cookie.
    #[error("could not handle the session cookie: {0}")]
    CookieError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("categories.name") =>
            {
                Error::DuplicateCategoryName(String::new())
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("users.username") =>
            {
                Error::DuplicateUsername(String::new())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequestBody(rejection.body_text())
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::EmptyUsername
            | Error::TooWeak(_)
            | Error::InvalidRequestBody(_)
            | Error::EmptyCategoryName
            | Error::InvalidCategoryId
            | Error::EmptySubscriptionName
            | Error::InvalidSubscriptionId
            | Error::InvalidCost
            | Error::InvalidBillingCycle(_)
            | Error::InvalidRenewalDay(_)
            | Error::InvalidCancelledAt
            | Error::ConfirmationRequired => StatusCode::BAD_REQUEST,
            Error::DuplicateUsername(_)
            | Error::DuplicateCategoryName(_)
            | Error::CancellationInProgress
            | Error::AlreadyCancelled => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::HashingError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::CookieError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::NOT_FOUND {
            return not_found::get_404_not_found_response();
        }

        // Server errors are not intended to be shown to the client.
        let message = if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
