//! Sets up the application database.

use rusqlite::{Connection, TransactionBehavior};

use crate::{
    Error, auth::create_user_table, category::create_category_table,
    subscription::create_subscription_table,
};

/// Enable foreign keys and create the application tables if they do not exist.
///
/// Foreign keys are a per-connection setting in SQLite, so this should be called on every new
/// connection. Deleting a category relies on them to delete its subscriptions.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_subscription_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
