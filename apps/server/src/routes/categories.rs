//! Category routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use stockline_core::Category;

use super::MessageResponse;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            get(get_category).put(rename_category).delete(delete_category),
        )
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryRequest {
    pub name: String,
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.db.categories().list().await?;
    Ok(Json(categories))
}

async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .db
        .categories()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", id))?;

    Ok(Json(category))
}

async fn create_category(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.catalog.create_category(&body.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn rename_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = state.catalog.rename_category(id, &body.name).await?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.catalog.delete_category(id).await?;
    Ok(Json(MessageResponse::new("Category deleted")))
}
