//! Database operations for subscriptions.
//!
//! Every query filters on both the subscription and the owning user.

use std::str::FromStr;

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    category::{CategoryId, get_category},
    subscription::{
        BillingCycle, NewSubscription, RenewalDay, Subscription, SubscriptionId, SubscriptionName,
    },
};

const SELECT_COLUMNS: &str = "SELECT id, name, cost, billing_cycle, renewal_date, account_info, \
    category_id, user_id, created_at, cancelled_at FROM subscriptions";

/// Save a new, active subscription in one of the user's categories.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not belong to `user_id`.
pub fn create_subscription(
    subscription: NewSubscription,
    user_id: UserID,
    connection: &Connection,
) -> Result<Subscription, Error> {
    get_category(subscription.category_id, user_id, connection)?;

    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO subscriptions
            (name, cost, billing_cycle, renewal_date, account_info, category_id, user_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        (
            subscription.name.as_ref(),
            subscription.cost.to_string(),
            subscription.billing_cycle.as_str(),
            subscription.renewal_date.as_u8(),
            &subscription.account_info,
            subscription.category_id,
            user_id.as_i64(),
            created_at,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Subscription {
        id,
        name: subscription.name,
        cost: subscription.cost,
        billing_cycle: subscription.billing_cycle,
        renewal_date: subscription.renewal_date,
        account_info: subscription.account_info,
        category_id: subscription.category_id,
        user_id,
        created_at,
        cancelled_at: None,
    })
}

/// Retrieve a single subscription owned by `user_id`.
pub fn get_subscription(
    subscription_id: SubscriptionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Subscription, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE id = :id AND user_id = :user_id;"
        ))?
        .query_row(
            &[(":id", &subscription_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve the subscriptions in one of the user's categories, newest first.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not belong to `user_id`.
pub fn list_subscriptions_by_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Subscription>, Error> {
    get_category(category_id, user_id, connection)?;

    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE category_id = :category_id AND user_id = :user_id
            ORDER BY created_at DESC, id DESC;"
        ))?
        .query_map(
            &[(":category_id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )?
        .map(|maybe_subscription| maybe_subscription.map_err(|error| error.into()))
        .collect()
}

/// Retrieve every subscription the user has, newest first.
pub fn list_subscriptions_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Subscription>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE user_id = :user_id ORDER BY created_at DESC, id DESC;"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_subscription| maybe_subscription.map_err(|error| error.into()))
        .collect()
}

/// Set or clear the time a subscription was cancelled.
///
/// Clearing the timestamp of an active subscription succeeds and changes nothing.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user has no subscription with that ID.
pub fn set_cancellation(
    subscription_id: SubscriptionId,
    user_id: UserID,
    cancelled_at: Option<OffsetDateTime>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE subscriptions SET cancelled_at = ?1 WHERE id = ?2 AND user_id = ?3",
        (cancelled_at, subscription_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete a subscription.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user has no subscription with that ID.
pub fn delete_subscription(
    subscription_id: SubscriptionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM subscriptions WHERE id = ?1 AND user_id = ?2",
        (subscription_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Initialize the subscriptions table and indexes.
pub fn create_subscription_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            cost TEXT NOT NULL,
            billing_cycle TEXT NOT NULL CHECK (billing_cycle IN ('day', 'week', 'month', 'annual')),
            renewal_date INTEGER NOT NULL CHECK (renewal_date BETWEEN 1 AND 31),
            account_info TEXT NOT NULL DEFAULT '',
            category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            cancelled_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_subscriptions_user_id ON subscriptions(user_id);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_category_id ON subscriptions(category_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Subscription, rusqlite::Error> {
    let raw_name: String = row.get(1)?;
    let raw_cost: String = row.get(2)?;
    let raw_billing_cycle: String = row.get(3)?;
    let raw_renewal_date: i64 = row.get(4)?;

    let cost = Decimal::from_str(&raw_cost)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(error)))?;
    let billing_cycle = BillingCycle::from_str(&raw_billing_cycle)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error)))?;
    let renewal_date = RenewalDay::new(raw_renewal_date).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(error))
    })?;

    Ok(Subscription {
        id: row.get(0)?,
        name: SubscriptionName::new_unchecked(&raw_name),
        cost,
        billing_cycle,
        renewal_date,
        account_info: row.get(5)?,
        category_id: row.get(6)?,
        user_id: UserID::new(row.get(7)?),
        created_at: row.get(8)?,
        cancelled_at: row.get(9)?,
    })
}
