//! Categories that transactions are filed under, and their route handlers.

mod core;
mod endpoints;

pub use core::{
    CategoryId, create_category, create_category_table, delete_category,
    ensure_categories_owned, get_category, list_categories, rename_category,
};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, get_category_endpoint,
    list_categories_endpoint, update_category_endpoint,
};
