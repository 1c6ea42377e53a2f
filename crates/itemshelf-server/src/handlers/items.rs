//! Item handlers
//!
//! Extractors arrive as `Result` so their rejections map to 422 with the
//! `{"detail": ...}` body instead of axum's plain-text defaults.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use itemshelf_types::{Item, ItemCreate, ItemPage, ItemUpdate};
use serde::Deserialize;

/// List query parameters. Unsigned types reject negatives at the extractor.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    skip: u32,
    #[serde(default = "default_limit")]
    limit: u32,
    search: Option<String>,
}

fn default_limit() -> u32 {
    100
}

pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ItemPage>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;

    // An empty search string means no filter, same as leaving it out
    let search = params.search.as_deref().filter(|s| !s.is_empty());

    let page = state
        .items
        .list(i64::from(params.skip), i64::from(params.limit), search)
        .await?;

    Ok(Json(page))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Item>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::Validation(e.body_text()))?;

    match state.items.get(id).await? {
        Some(item) => Ok(Json(item)),
        None => Err(ApiError::NotFound),
    }
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<ItemCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let Json(new_item) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    new_item.validate()?;

    let item = state.items.create(&new_item).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ItemUpdate>, JsonRejection>,
) -> Result<Json<Item>, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::Validation(e.body_text()))?;
    let Json(changes) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    changes.validate()?;

    match state.items.update(id, &changes).await? {
        Some(item) => Ok(Json(item)),
        None => Err(ApiError::NotFound),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id.map_err(|e| ApiError::Validation(e.body_text()))?;

    if state.items.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
