//! The cancellation workflow moves a subscription from active to cancelled.
//!
//! A confirmed cancellation waits out a grace period in the `processing` state
//! before the cancellation time is written to the database.

mod endpoint;
mod store;
mod workflow;

pub use endpoint::{confirm_cancellation_endpoint, get_cancellation_status_endpoint};
pub use store::{CancellationStore, SQLiteCancellationStore};
pub use workflow::{
    CancellationEvent, CancellationState, CancellationStatus, CancellationWorkflow,
    DEFAULT_GRACE_PERIOD,
};
