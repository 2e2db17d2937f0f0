//! Categories group a user's subscriptions.

mod create;
mod db;
mod delete;
mod domain;
mod list;

pub use create::create_category_endpoint;
pub use db::{
    create_category, create_category_table, delete_category, get_category, list_categories,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryId, CategoryName, parse_category_id};
pub use list::list_categories_endpoint;
