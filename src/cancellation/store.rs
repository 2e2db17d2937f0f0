//! Defines the storage the cancellation workflow reads from and writes to.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    subscription::{SubscriptionId, get_subscription, set_cancellation},
};

/// Reads and writes the cancellation time of subscriptions.
pub trait CancellationStore: Send + Sync {
    /// Get the time the subscription was cancelled, or `None` if it is active.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if `user_id` has no subscription with that ID.
    fn get_cancelled_at(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserID,
    ) -> Result<Option<OffsetDateTime>, Error>;

    /// Set or clear the time the subscription was cancelled.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if `user_id` has no subscription with that ID.
    fn set_cancellation(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserID,
        cancelled_at: Option<OffsetDateTime>,
    ) -> Result<(), Error>;
}

/// Reads and writes cancellation times in the SQLite subscriptions table.
#[derive(Debug, Clone)]
pub struct SQLiteCancellationStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteCancellationStore {
    /// Create a new cancellation store with a SQLite database.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl CancellationStore for SQLiteCancellationStore {
    fn get_cancelled_at(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserID,
    ) -> Result<Option<OffsetDateTime>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        get_subscription(subscription_id, user_id, &connection)
            .map(|subscription| subscription.cancelled_at)
    }

    fn set_cancellation(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserID,
        cancelled_at: Option<OffsetDateTime>,
    ) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        set_cancellation(subscription_id, user_id, cancelled_at, &connection)
    }
}
