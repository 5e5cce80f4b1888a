//! Per-user categories that transactions can be filed under.

use std::fmt::Display;

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{Error, user::UserId};

/// Database identifier for a category.
pub type CategoryId = i64;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name with surrounding whitespace removed.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidRequest] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::InvalidRequest(
                "the category name cannot be empty".to_owned(),
            ))
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CategoryName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CategoryName> for String {
    fn from(value: CategoryName) -> Self {
        value.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A label a user files transactions under, e.g. "Groceries".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: CategoryName,
}

/// Create a category for `owner`.
///
/// # Errors
///
/// Returns [Error::InvalidRequest] for a blank name, [Error::DuplicateCategoryName] if `owner`
/// already has a category with that name, or [Error::SqlError] for other SQL errors.
pub fn create_category(name: &str, owner: UserId, connection: &Connection) -> Result<Category, Error> {
    let name = CategoryName::new(name)?;

    connection
        .prepare("INSERT INTO categories (user_id, name) VALUES (?1, ?2) RETURNING id, user_id, name")?
        .query_row(params![owner.as_i64(), name.as_ref()], map_category_row)
        .map_err(|error| map_duplicate_name(error, &name))
}

/// Retrieve one of `owner`'s categories.
pub fn get_category(id: CategoryId, owner: UserId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, user_id, name FROM categories WHERE id = ?1 AND user_id = ?2")?
        .query_row(params![id, owner.as_i64()], map_category_row)
        .map_err(|error| error.into())
}

/// Retrieve all of `owner`'s categories ordered alphabetically by name.
pub fn list_categories(owner: UserId, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, user_id, name FROM categories WHERE user_id = ?1 ORDER BY name ASC")?
        .query_map([owner.as_i64()], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Rename one of `owner`'s categories.
///
/// # Errors
///
/// Returns [Error::NotFound] if `owner` has no category `id`, and the same errors as
/// [create_category] for the new name.
pub fn rename_category(
    id: CategoryId,
    name: &str,
    owner: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = CategoryName::new(name)?;

    connection
        .prepare(
            "UPDATE categories SET name = ?1 WHERE id = ?2 AND user_id = ?3
             RETURNING id, user_id, name",
        )?
        .query_row(params![name.as_ref(), id, owner.as_i64()], map_category_row)
        .map_err(|error| map_duplicate_name(error, &name))
}

/// Delete one of `owner`'s categories. Links to transactions are removed with it.
pub fn delete_category(id: CategoryId, owner: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
        params![id, owner.as_i64()],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Check that every category in `category_ids` belongs to `owner`.
///
/// # Errors
///
/// Returns [Error::NotFound] for the first category that does not exist or belongs to another
/// user.
pub fn ensure_categories_owned(
    category_ids: &[CategoryId],
    owner: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let mut statement =
        connection.prepare("SELECT 1 FROM categories WHERE id = ?1 AND user_id = ?2")?;

    for category_id in category_ids {
        if !statement.exists(params![category_id, owner.as_i64()])? {
            tracing::debug!("category {category_id} is not owned by user {owner}");
            return Err(Error::NotFound);
        }
    }

    Ok(())
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_categories_user_id ON categories(user_id);",
    )?;

    Ok(())
}

fn map_duplicate_name(error: rusqlite::Error, name: &CategoryName) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateCategoryName(name.to_string()),
        error => error.into(),
    }
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(2)?;

    Ok(Category {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        name: CategoryName::new_unchecked(&raw_name),
    })
}
