//! Route handlers for a user's categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::Claims,
    category::{
        CategoryId, create_category, delete_category, get_category, list_categories,
        rename_category,
    },
    db::lock_connection,
};

/// The state needed for the category routes.
#[derive(Debug, Clone)]
pub struct CategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating or renaming a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

/// A route handler for creating a category.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    claims: Claims,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = create_category(&request.name, claims.user_id(), &connection)?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// A route handler for listing the current user's categories.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    claims: Claims,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let categories = list_categories(claims.user_id(), &connection)?;

    Ok(Json(categories))
}

/// A route handler for getting one of the current user's categories.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    claims: Claims,
    Path(category_id): Path<CategoryId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = get_category(category_id, claims.user_id(), &connection)?;

    Ok(Json(category))
}

/// A route handler for renaming a category.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    claims: Claims,
    Path(category_id): Path<CategoryId>,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let category = rename_category(category_id, &request.name, claims.user_id(), &connection)?;

    Ok(Json(category))
}

/// A route handler for deleting a category.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    claims: Claims,
    Path(category_id): Path<CategoryId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_category(category_id, claims.user_id(), &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
