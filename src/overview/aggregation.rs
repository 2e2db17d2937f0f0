//! Groups subscriptions by category and totals their costs.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    cancellation::CancellationState,
    category::{Category, CategoryId},
    subscription::{Subscription, SubscriptionId, round_to_cents},
};

/// A subscription along with where it is in the cancellation workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub status: CancellationState,
}

/// A category, its subscriptions and the cost of the active ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryWithSubscriptions {
    #[serde(flatten)]
    pub category: Category,
    pub subscriptions: Vec<SubscriptionView>,
    pub subtotal: Decimal,
}

/// Every category of a user with the combined cost of all active subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub categories: Vec<CategoryWithSubscriptions>,
    pub grand_total: Decimal,
}

/// Attach each subscription to its category and total the costs.
///
/// Subtotals only count subscriptions without a cancellation time, so a
/// subscription that is `processing` still counts. Categories and
/// subscriptions keep the order they are given in.
pub fn build_overview(
    categories: Vec<Category>,
    subscriptions: Vec<Subscription>,
    processing: &HashSet<SubscriptionId>,
) -> Overview {
    let mut subscriptions_by_category: HashMap<CategoryId, Vec<Subscription>> = HashMap::new();

    for subscription in subscriptions {
        subscriptions_by_category
            .entry(subscription.category_id)
            .or_default()
            .push(subscription);
    }

    let categories: Vec<CategoryWithSubscriptions> = categories
        .into_iter()
        .map(|category| {
            let subscriptions = subscriptions_by_category
                .remove(&category.id)
                .unwrap_or_default();

            let subtotal = round_to_cents(
                subscriptions
                    .iter()
                    .filter(|subscription| subscription.is_active())
                    .map(|subscription| subscription.cost)
                    .fold(Decimal::ZERO, Decimal::saturating_add),
            );

            let subscriptions = subscriptions
                .into_iter()
                .map(|subscription| {
                    let status = if subscription.cancelled_at.is_some() {
                        CancellationState::Cancelled
                    } else if processing.contains(&subscription.id) {
                        CancellationState::Processing
                    } else {
                        CancellationState::Active
                    };

                    SubscriptionView {
                        subscription,
                        status,
                    }
                })
                .collect();

            CategoryWithSubscriptions {
                category,
                subscriptions,
                subtotal,
            }
        })
        .collect();

    let grand_total = round_to_cents(
        categories
            .iter()
            .map(|category| category.subtotal)
            .fold(Decimal::ZERO, Decimal::saturating_add),
    );

    Overview {
        categories,
        grand_total,
    }
}

#[cfg(test)]
mod build_overview_tests {
    use std::{collections::HashSet, str::FromStr};

    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    use crate::{
        BillingCycle, Category, CategoryName, RenewalDay, Subscription, SubscriptionName, UserID,
        cancellation::CancellationState,
    };

    use super::build_overview;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: CategoryName::new_unchecked(name),
            created_at: OffsetDateTime::UNIX_EPOCH,
            user_id: UserID::new(1),
        }
    }

    fn subscription(id: i64, category_id: i64, cost: &str, cancelled: bool) -> Subscription {
        Subscription {
            id,
            name: SubscriptionName::new_unchecked("Subscription"),
            cost: Decimal::from_str(cost).unwrap(),
            billing_cycle: BillingCycle::Month,
            renewal_date: RenewalDay::new(1).unwrap(),
            account_info: String::new(),
            category_id,
            user_id: UserID::new(1),
            created_at: OffsetDateTime::UNIX_EPOCH,
            cancelled_at: cancelled.then_some(OffsetDateTime::UNIX_EPOCH),
        }
    }

    #[test]
    fn grand_total_excludes_cancelled_subscriptions() {
        let overview = build_overview(
            vec![category(1, "Streaming"), category(2, "Utilities")],
            vec![
                subscription(1, 1, "9.99", false),
                subscription(2, 2, "5.00", false),
                subscription(3, 1, "100.00", true),
            ],
            &HashSet::new(),
        );

        assert_eq!(overview.grand_total.to_string(), "14.99");
        assert_eq!(overview.categories[0].subtotal.to_string(), "9.99");
        assert_eq!(overview.categories[1].subtotal.to_string(), "5.00");
        assert_eq!(overview.categories[0].subscriptions.len(), 2);
    }

    #[test]
    fn totals_do_not_overflow() {
        let overview = build_overview(
            vec![category(1, "Streaming"), category(2, "Utilities")],
            vec![
                subscription(1, 1, "79228162514264337593543950335", false),
                subscription(2, 1, "79228162514264337593543950335", false),
                subscription(3, 2, "1000000000.00", false),
            ],
            &HashSet::new(),
        );

        assert_eq!(overview.categories[0].subtotal, Decimal::MAX);
        assert_eq!(overview.grand_total, Decimal::MAX);
    }

    #[test]
    fn processing_subscriptions_still_count() {
        let overview = build_overview(
            vec![category(1, "Streaming")],
            vec![subscription(1, 1, "9.99", false)],
            &HashSet::from([1]),
        );

        assert_eq!(overview.categories[0].subtotal.to_string(), "9.99");
        assert_eq!(
            overview.categories[0].subscriptions[0].status,
            CancellationState::Processing
        );
    }

    #[test]
    fn empty_category_has_zero_subtotal() {
        let overview = build_overview(vec![category(1, "Streaming")], vec![], &HashSet::new());

        assert_eq!(overview.categories[0].subtotal.to_string(), "0.00");
        assert_eq!(overview.grand_total.to_string(), "0.00");
        assert!(overview.categories[0].subscriptions.is_empty());
    }

    #[test]
    fn keeps_category_and_subscription_order() {
        let overview = build_overview(
            vec![category(2, "Utilities"), category(1, "Streaming")],
            vec![
                subscription(5, 1, "1.00", false),
                subscription(4, 1, "1.00", false),
            ],
            &HashSet::new(),
        );

        let category_ids: Vec<i64> = overview.categories.iter().map(|c| c.category.id).collect();
        assert_eq!(category_ids, vec![2, 1]);
        let subscription_ids: Vec<i64> = overview.categories[1]
            .subscriptions
            .iter()
            .map(|s| s.subscription.id)
            .collect();
        assert_eq!(subscription_ids, vec![5, 4]);
    }

    #[test]
    fn cancelled_status_wins_over_processing() {
        let overview = build_overview(
            vec![category(1, "Streaming")],
            vec![subscription(1, 1, "9.99", true)],
            &HashSet::from([1]),
        );

        assert_eq!(
            overview.categories[0].subscriptions[0].status,
            CancellationState::Cancelled
        );
    }
}
