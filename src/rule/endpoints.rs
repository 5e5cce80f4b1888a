//! Route handlers for categorization rules.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Claims,
    db::lock_connection,
    rule::{
        RuleData, RuleId, apply_rules_to_uncategorized, create_rule, delete_rule, get_rule,
        list_rules, update_rule,
    },
};

/// The state needed for the rule routes.
#[derive(Debug, Clone)]
pub struct RuleState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RuleState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a rule.
pub async fn create_rule_endpoint(
    State(state): State<RuleState>,
    claims: Claims,
    Json(rule): Json<RuleData>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let rule = create_rule(&rule, claims.user_id(), &connection)?;

    Ok((StatusCode::CREATED, Json(rule)))
}

/// A route handler for listing the current user's rules in the order they are tried.
pub async fn list_rules_endpoint(
    State(state): State<RuleState>,
    claims: Claims,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let rules = list_rules(claims.user_id(), &connection)?;

    Ok(Json(rules))
}

/// A route handler for getting one of the current user's rules.
pub async fn get_rule_endpoint(
    State(state): State<RuleState>,
    claims: Claims,
    Path(rule_id): Path<RuleId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let rule = get_rule(rule_id, claims.user_id(), &connection)?;

    Ok(Json(rule))
}

/// A route handler for editing a rule.
pub async fn update_rule_endpoint(
    State(state): State<RuleState>,
    claims: Claims,
    Path(rule_id): Path<RuleId>,
    Json(rule): Json<RuleData>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let rule = update_rule(rule_id, &rule, claims.user_id(), &connection)?;

    Ok(Json(rule))
}

/// A route handler for deleting a rule.
pub async fn delete_rule_endpoint(
    State(state): State<RuleState>,
    claims: Claims,
    Path(rule_id): Path<RuleId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_rule(rule_id, claims.user_id(), &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler that files the current user's uncategorized transactions using their rules.
pub async fn apply_rules_endpoint(
    State(state): State<RuleState>,
    claims: Claims,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let result = apply_rules_to_uncategorized(claims.user_id(), &connection)?;

    Ok(Json(result))
}
