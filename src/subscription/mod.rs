//! Subscriptions are the recurring payments a user tracks, grouped by category.

mod create;
mod db;
mod delete;
mod domain;
mod list;
mod update;

pub use create::create_subscription_endpoint;
pub use db::{
    create_subscription, create_subscription_table, delete_subscription, get_subscription,
    list_subscriptions_by_category, list_subscriptions_for_user, set_cancellation,
};
pub use delete::delete_subscription_endpoint;
pub use domain::{
    BillingCycle, NewSubscription, RenewalDay, Subscription, SubscriptionId, SubscriptionName,
    parse_subscription_id, round_to_cents,
};
pub use list::list_category_subscriptions_endpoint;
pub use update::update_cancellation_endpoint;
