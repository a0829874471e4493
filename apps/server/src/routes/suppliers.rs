//! Supplier routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use stockline_core::Supplier;
use stockline_db::SupplierFields;

use super::MessageResponse;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/api/suppliers/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SupplierRequest {
    pub name: String,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl From<SupplierRequest> for SupplierFields {
    fn from(req: SupplierRequest) -> Self {
        SupplierFields {
            name: req.name,
            contact: req.contact,
            email: req.email,
            phone: req.phone,
            address: req.address,
        }
    }
}

async fn list_suppliers(State(state): State<AppState>) -> Result<Json<Vec<Supplier>>, ApiError> {
    let suppliers = state.db.suppliers().list().await?;
    Ok(Json(suppliers))
}

async fn get_supplier(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Supplier>, ApiError> {
    let supplier = state
        .db
        .suppliers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier", id))?;

    Ok(Json(supplier))
}

async fn create_supplier(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SupplierRequest>,
) -> Result<(StatusCode, Json<Supplier>), ApiError> {
    let supplier = state.catalog.create_supplier(body.into()).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// Full overwrite: omitted optional fields are cleared.
async fn update_supplier(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<SupplierRequest>,
) -> Result<Json<Supplier>, ApiError> {
    let supplier = state.catalog.update_supplier(id, body.into()).await?;
    Ok(Json(supplier))
}

async fn delete_supplier(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.catalog.delete_supplier(id).await?;
    Ok(Json(MessageResponse::new("Supplier deleted")))
}
