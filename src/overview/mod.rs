//! Categories together with their subscriptions and what they cost.

mod aggregation;
mod endpoint;

pub use aggregation::{CategoryWithSubscriptions, Overview, SubscriptionView, build_overview};
pub use endpoint::get_overview_endpoint;
