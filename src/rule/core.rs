//! Categorization rules and their table.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    category::{CategoryId, ensure_categories_owned},
    user::UserId,
};

pub type RuleId = i64;

/// A rule that files transactions under a category when their description contains a pattern.
/// Pattern matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Rule {
    pub id: RuleId,
    pub user_id: UserId,

    /// The text that transaction descriptions must contain (case-insensitive).
    pub pattern: String,

    /// The category to apply when this rule matches.
    pub category_id: CategoryId,
}

/// The request body for creating and editing rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleData {
    pub pattern: String,
    pub category_id: CategoryId,
}

/// Create a rule for `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidRequest] if the pattern is blank or the same rule already exists,
/// - [Error::NotFound] if the category is not one of `owner`'s categories,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_rule(rule: &RuleData, owner: UserId, connection: &Connection) -> Result<Rule, Error> {
    let pattern = validate_pattern(&rule.pattern)?;
    ensure_categories_owned(&[rule.category_id], owner, connection)?;

    connection
        .prepare(
            "INSERT INTO categorization_rules (user_id, pattern, category_id) VALUES (?1, ?2, ?3)
             RETURNING id, user_id, pattern, category_id",
        )?
        .query_row(
            params![owner.as_i64(), pattern, rule.category_id],
            map_rule_row,
        )
        .map_err(map_duplicate_rule)
}

/// Retrieve one of `owner`'s rules.
pub fn get_rule(rule_id: RuleId, owner: UserId, connection: &Connection) -> Result<Rule, Error> {
    connection
        .prepare(
            "SELECT id, user_id, pattern, category_id FROM categorization_rules
             WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![rule_id, owner.as_i64()], map_rule_row)
        .map_err(|error| error.into())
}

/// Retrieve all of `owner`'s rules, longest pattern first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_rules(owner: UserId, connection: &Connection) -> Result<Vec<Rule>, Error> {
    connection
        // Longer patterns are more specific, so ambiguous patterns (e.g. uber, uber eats) match
        // the longer one first.
        .prepare(
            "SELECT id, user_id, pattern, category_id FROM categorization_rules
             WHERE user_id = ?1
             ORDER BY LENGTH(pattern) DESC, id ASC",
        )?
        .query_map([owner.as_i64()], map_rule_row)?
        .map(|maybe_rule| maybe_rule.map_err(|error| error.into()))
        .collect()
}

/// Change the pattern and category of one of `owner`'s rules.
///
/// # Errors
/// Returns [Error::NotFound] if the rule or the category is not `owner`'s, and the same errors
/// as [create_rule] otherwise.
pub fn update_rule(
    rule_id: RuleId,
    rule: &RuleData,
    owner: UserId,
    connection: &Connection,
) -> Result<Rule, Error> {
    let pattern = validate_pattern(&rule.pattern)?;
    ensure_categories_owned(&[rule.category_id], owner, connection)?;

    connection
        .prepare(
            "UPDATE categorization_rules SET pattern = ?1, category_id = ?2
             WHERE id = ?3 AND user_id = ?4
             RETURNING id, user_id, pattern, category_id",
        )?
        .query_row(
            params![pattern, rule.category_id, rule_id, owner.as_i64()],
            map_rule_row,
        )
        .map_err(map_duplicate_rule)
}

/// Delete one of `owner`'s rules.
///
/// # Errors
/// Returns [Error::NotFound] if `owner` has no rule with the ID `rule_id`.
pub fn delete_rule(rule_id: RuleId, owner: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM categorization_rules WHERE id = ?1 AND user_id = ?2",
        params![rule_id, owner.as_i64()],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

pub fn create_rule_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categorization_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            pattern TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES categories(id) ON UPDATE CASCADE ON DELETE CASCADE,
            UNIQUE(user_id, pattern, category_id)
        );

        CREATE INDEX IF NOT EXISTS idx_categorization_rules_user_id
            ON categorization_rules(user_id);",
    )?;

    Ok(())
}

fn validate_pattern(pattern: &str) -> Result<&str, Error> {
    let pattern = pattern.trim();

    if pattern.is_empty() {
        return Err(Error::InvalidRequest(
            "the rule pattern cannot be empty".to_owned(),
        ));
    }

    Ok(pattern)
}

fn map_duplicate_rule(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::InvalidRequest("an identical rule already exists".to_owned()),
        error => error.into(),
    }
}

fn map_rule_row(row: &Row) -> Result<Rule, rusqlite::Error> {
    Ok(Rule {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        pattern: row.get(2)?,
        category_id: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        category::create_category,
        rule::{RuleData, create_rule, delete_rule, get_rule, list_rules, update_rule},
        test_utils::{create_test_user, get_test_connection},
    };

    #[test]
    fn create_rule_trims_pattern() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let category = create_category("Transporte", owner, &conn).unwrap();

        let rule = create_rule(
            &RuleData {
                pattern: "  uber ".to_owned(),
                category_id: category.id,
            },
            owner,
            &conn,
        )
        .unwrap();

        assert_eq!(rule.pattern, "uber");
        assert_eq!(get_rule(rule.id, owner, &conn), Ok(rule));
    }

    #[test]
    fn create_rule_rejects_blank_pattern_and_duplicates() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let category = create_category("Transporte", owner, &conn).unwrap();
        let data = RuleData {
            pattern: "uber".to_owned(),
            category_id: category.id,
        };
        create_rule(&data, owner, &conn).unwrap();

        assert!(matches!(
            create_rule(&data, owner, &conn),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            create_rule(
                &RuleData {
                    pattern: " ".to_owned(),
                    category_id: category.id
                },
                owner,
                &conn
            ),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn create_rule_requires_own_category() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let other = create_test_user("other@example.com", &conn);
        let category = create_category("Transporte", other, &conn).unwrap();

        let result = create_rule(
            &RuleData {
                pattern: "uber".to_owned(),
                category_id: category.id,
            },
            owner,
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn list_rules_orders_longest_pattern_first() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let category = create_category("Transporte", owner, &conn).unwrap();
        for pattern in ["uber", "uber eats", "99"] {
            create_rule(
                &RuleData {
                    pattern: pattern.to_owned(),
                    category_id: category.id,
                },
                owner,
                &conn,
            )
            .unwrap();
        }

        let patterns: Vec<String> = list_rules(owner, &conn)
            .unwrap()
            .into_iter()
            .map(|rule| rule.pattern)
            .collect();

        assert_eq!(patterns, vec!["uber eats", "uber", "99"]);
    }

    #[test]
    fn update_and_delete_are_scoped_to_owner() {
        let conn = get_test_connection();
        let owner = create_test_user("owner@example.com", &conn);
        let other = create_test_user("other@example.com", &conn);
        let category = create_category("Transporte", owner, &conn).unwrap();
        let rule = create_rule(
            &RuleData {
                pattern: "uber".to_owned(),
                category_id: category.id,
            },
            owner,
            &conn,
        )
        .unwrap();
        let edit = RuleData {
            pattern: "99 taxi".to_owned(),
            category_id: category.id,
        };

        assert_eq!(update_rule(rule.id, &edit, other, &conn), Err(Error::NotFound));
        assert_eq!(delete_rule(rule.id, other, &conn), Err(Error::NotFound));

        let updated = update_rule(rule.id, &edit, owner, &conn).unwrap();
        assert_eq!(updated.pattern, "99 taxi");

        delete_rule(rule.id, owner, &conn).unwrap();
        assert_eq!(get_rule(rule.id, owner, &conn), Err(Error::NotFound));
    }
}
