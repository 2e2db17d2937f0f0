//! Database operations for categories.
//!
//! Every query is scoped to the owning user, so a category that belongs to
//! someone else looks the same as one that does not exist.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    category::{Category, CategoryId, CategoryName},
};

/// Create a category for `user_id` and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if the user already has a category called `name`.
pub fn create_category(
    name: CategoryName,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO categories (name, created_at, user_id) VALUES (?1, ?2, ?3);",
            (name.as_ref(), created_at, user_id.as_i64()),
        )
        .map_err(|error| match Error::from(error) {
            Error::DuplicateCategoryName(_) => Error::DuplicateCategoryName(name.to_string()),
            error => error,
        })?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name,
        created_at,
        user_id,
    })
}

/// Retrieve a single category owned by `user_id`.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, created_at, user_id FROM categories
            WHERE id = :id AND user_id = :user_id;",
        )?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's categories, newest first.
pub fn list_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, created_at, user_id FROM categories
            WHERE user_id = :user_id
            ORDER BY created_at DESC, id DESC;",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Delete a category and, through the foreign key cascade, its subscriptions.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user has no category with that ID.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Initialize the categories table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            UNIQUE(name, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_categories_user_id ON categories(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        created_at: row.get(2)?,
        user_id: UserID::new(row.get(3)?),
    })
}
