use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    BillingCycle, Category, CategoryName, NewSubscription, PasswordHash, RenewalDay,
    Subscription, SubscriptionName, User, Username, auth::create_user, create_category,
    create_subscription, initialize_db,
};

/// An in-memory database with all of the application tables.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not create in-memory SQLite database");
    initialize_db(&connection).expect("Could not initialize database");

    connection
}

pub(crate) fn create_test_user(username: &str, connection: &Connection) -> User {
    create_user(
        Username::new(username).unwrap(),
        PasswordHash::new_unchecked("hunter2"),
        connection,
    )
    .expect("Could not create test user")
}

pub(crate) fn create_test_category(name: &str, user: &User, connection: &Connection) -> Category {
    create_category(CategoryName::new_unchecked(name), user.id, connection)
        .expect("Could not create test category")
}

pub(crate) fn create_test_subscription(
    name: &str,
    cost: &str,
    category: &Category,
    connection: &Connection,
) -> Subscription {
    let subscription = NewSubscription {
        name: SubscriptionName::new_unchecked(name),
        cost: Decimal::from_str(cost).unwrap(),
        billing_cycle: BillingCycle::Month,
        renewal_date: RenewalDay::new(1).unwrap(),
        account_info: String::new(),
        category_id: category.id,
    };

    create_subscription(subscription, category.user_id, connection)
        .expect("Could not create test subscription")
}
