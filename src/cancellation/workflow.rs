//! The state machine that takes a subscription from active to cancelled.

use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::{sync::broadcast, task::AbortHandle};

use crate::{Error, UserID, cancellation::CancellationStore, subscription::SubscriptionId};

/// How long a confirmed cancellation waits before it is saved, unless configured otherwise.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Shown to the client when a cancellation could not be saved. The cause is logged.
const SAVE_FAILED_MESSAGE: &str = "the cancellation could not be saved, please try again";

/// How many events a slow subscriber may fall behind before it misses some.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Where a subscription is in the cancellation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationState {
    /// The subscription is active and counts towards totals.
    Active,
    /// The cancellation is confirmed and waiting out the grace period.
    /// The subscription still counts towards totals.
    Processing,
    /// The cancellation time has been saved.
    Cancelled,
}

/// The workflow state of one subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationStatus {
    pub subscription_id: SubscriptionId,
    pub state: CancellationState,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cancelled_at: Option<OffsetDateTime>,
    /// Why the last cancellation attempt failed, if it did.
    pub last_error: Option<String>,
}

/// Sent to subscribers whenever a subscription changes state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationEvent {
    pub subscription_id: SubscriptionId,
    pub user_id: UserID,
    pub state: CancellationState,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cancelled_at: Option<OffsetDateTime>,
    pub error: Option<String>,
}

/// A cancellation waiting out its grace period.
struct InFlight {
    user_id: UserID,
    abort_handle: AbortHandle,
}

struct Inner {
    store: Arc<dyn CancellationStore>,
    grace_period: Duration,
    in_flight: Mutex<HashMap<SubscriptionId, InFlight>>,
    failures: Mutex<HashMap<SubscriptionId, String>>,
    events: broadcast::Sender<CancellationEvent>,
}

/// Runs cancellations for every user.
///
/// Confirming a cancellation moves the subscription to `processing` straight
/// away and spawns a task that saves the cancellation time once the grace
/// period has passed. If saving fails the subscription goes back to `active`.
/// Each subscription has at most one pending cancellation.
///
/// Pending cancellations live in memory only and are dropped when the process exits.
#[derive(Clone)]
pub struct CancellationWorkflow {
    inner: Arc<Inner>,
}

impl Debug for CancellationWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationWorkflow")
            .field("grace_period", &self.inner.grace_period)
            .field("in_flight", &self.inner.lock_in_flight().len())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<SubscriptionId, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_failures(&self) -> MutexGuard<'_, HashMap<SubscriptionId, String>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_in_flight_for(&self, subscription_id: SubscriptionId, user_id: UserID) -> bool {
        self.lock_in_flight()
            .get(&subscription_id)
            .is_some_and(|in_flight| in_flight.user_id == user_id)
    }

    fn emit(&self, event: CancellationEvent) {
        // An error only means that nobody is listening.
        let _ = self.events.send(event);
    }

    /// Save the cancellation once the grace period is over.
    async fn finish(self: Arc<Self>, subscription_id: SubscriptionId, user_id: UserID) {
        tokio::time::sleep(self.grace_period).await;

        let cancelled_at = OffsetDateTime::now_utc();
        let result = self
            .store
            .set_cancellation(subscription_id, user_id, Some(cancelled_at));

        self.lock_in_flight().remove(&subscription_id);

        match result {
            Ok(()) => {
                tracing::info!("Cancelled subscription {subscription_id} for user {user_id}");
                self.emit(CancellationEvent {
                    subscription_id,
                    user_id,
                    state: CancellationState::Cancelled,
                    cancelled_at: Some(cancelled_at),
                    error: None,
                });
            }
            Err(Error::NotFound) => {
                tracing::info!(
                    "Subscription {subscription_id} was deleted before its cancellation was saved"
                );
                self.lock_failures().remove(&subscription_id);
            }
            Err(error) => {
                tracing::error!(
                    "Could not save cancellation of subscription {subscription_id}: {error}"
                );
                self.lock_failures()
                    .insert(subscription_id, SAVE_FAILED_MESSAGE.to_owned());
                self.emit(CancellationEvent {
                    subscription_id,
                    user_id,
                    state: CancellationState::Active,
                    cancelled_at: None,
                    error: Some(SAVE_FAILED_MESSAGE.to_owned()),
                });
            }
        }
    }
}

impl CancellationWorkflow {
    /// Create a workflow that saves cancellations to `store` after `grace_period`.
    pub fn new(store: Arc<dyn CancellationStore>, grace_period: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                store,
                grace_period,
                in_flight: Mutex::new(HashMap::new()),
                failures: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// How long a confirmed cancellation waits before it is saved.
    pub fn grace_period(&self) -> Duration {
        self.inner.grace_period
    }

    /// Receive an event each time a subscription changes state.
    pub fn subscribe(&self) -> broadcast::Receiver<CancellationEvent> {
        self.inner.events.subscribe()
    }

    /// Whether the subscription has a cancellation waiting out its grace period.
    pub fn is_processing(&self, subscription_id: SubscriptionId) -> bool {
        self.inner.lock_in_flight().contains_key(&subscription_id)
    }

    /// The subscriptions of `user_id` with a cancellation waiting out its grace period.
    pub fn processing_for_user(&self, user_id: UserID) -> HashSet<SubscriptionId> {
        self.with_processing(user_id, HashSet::clone)
    }

    /// Call `f` with the subscriptions of `user_id` that are `processing`.
    ///
    /// No cancellation is confirmed or leaves `processing` while `f` runs, so
    /// `f` may read or write the database and stay consistent with the set.
    /// `f` must not call back into the workflow.
    pub fn with_processing<T>(
        &self,
        user_id: UserID,
        f: impl FnOnce(&HashSet<SubscriptionId>) -> T,
    ) -> T {
        let in_flight = self.inner.lock_in_flight();
        let processing = in_flight
            .iter()
            .filter(|(_, pending)| pending.user_id == user_id)
            .map(|(subscription_id, _)| *subscription_id)
            .collect();

        f(&processing)
    }

    /// Forget why the last cancellation of a subscription failed.
    ///
    /// Call this once the subscription is deleted or its cancellation time is set directly.
    pub fn clear_failure(&self, subscription_id: SubscriptionId) {
        self.inner.lock_failures().remove(&subscription_id);
    }

    /// The workflow state of one of the user's subscriptions.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if `user_id` has no subscription with that ID.
    pub fn status(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserID,
    ) -> Result<CancellationStatus, Error> {
        let cancelled_at = match self.inner.store.get_cancelled_at(subscription_id, user_id) {
            Ok(cancelled_at) => cancelled_at,
            Err(Error::NotFound) => {
                self.clear_failure(subscription_id);
                return Err(Error::NotFound);
            }
            Err(error) => return Err(error),
        };

        let state = if cancelled_at.is_some() {
            CancellationState::Cancelled
        } else if self.inner.is_in_flight_for(subscription_id, user_id) {
            CancellationState::Processing
        } else {
            CancellationState::Active
        };

        let last_error = match state {
            CancellationState::Active => self.inner.lock_failures().get(&subscription_id).cloned(),
            CancellationState::Processing => None,
            CancellationState::Cancelled => {
                self.clear_failure(subscription_id);
                None
            }
        };

        Ok(CancellationStatus {
            subscription_id,
            state,
            cancelled_at,
            last_error,
        })
    }

    /// Start cancelling one of the user's subscriptions.
    ///
    /// The subscription is `processing` when this returns and the cancellation
    /// is saved after the grace period.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::ConfirmationRequired] if `confirmed` is false.
    /// - [Error::NotFound] if `user_id` has no subscription with that ID.
    /// - [Error::AlreadyCancelled] if the subscription is already cancelled.
    /// - [Error::CancellationInProgress] if the subscription is already `processing`.
    pub fn confirm(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserID,
        confirmed: bool,
    ) -> Result<CancellationStatus, Error> {
        if !confirmed {
            return Err(Error::ConfirmationRequired);
        }

        {
            // Held across the read so that a direct write to `cancelled_at`
            // cannot land between the read and the timer starting.
            let mut in_flight = self.inner.lock_in_flight();

            if self
                .inner
                .store
                .get_cancelled_at(subscription_id, user_id)?
                .is_some()
            {
                return Err(Error::AlreadyCancelled);
            }

            if in_flight.contains_key(&subscription_id) {
                return Err(Error::CancellationInProgress);
            }

            let task = tokio::spawn(self.inner.clone().finish(subscription_id, user_id));
            in_flight.insert(
                subscription_id,
                InFlight {
                    user_id,
                    abort_handle: task.abort_handle(),
                },
            );
        }

        self.inner.lock_failures().remove(&subscription_id);

        tracing::info!(
            "Cancelling subscription {subscription_id} for user {user_id} in {:?}",
            self.inner.grace_period
        );
        self.inner.emit(CancellationEvent {
            subscription_id,
            user_id,
            state: CancellationState::Processing,
            cancelled_at: None,
            error: None,
        });

        Ok(CancellationStatus {
            subscription_id,
            state: CancellationState::Processing,
            cancelled_at: None,
            last_error: None,
        })
    }

    /// Abort every pending cancellation.
    ///
    /// The affected subscriptions stay active in the database.
    pub fn shutdown(&self) {
        let mut in_flight = self.inner.lock_in_flight();

        if !in_flight.is_empty() {
            tracing::warn!(
                "Dropping {} pending cancellation(s) on shutdown",
                in_flight.len()
            );
        }

        for (_, pending) in in_flight.drain() {
            pending.abort_handle.abort();
        }
    }
}
