//! # Sale Routes
//!
//! Checkout, sale history and cancellation.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/sales { items: [{productId, qty, price}], total? }          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InventoryLedger::record_sale (one unit of work)                       │
//! │       │  1. check every product exists and has Σqty in stock           │
//! │       │  2. insert sale + items                                        │
//! │       │  3. decrement stock, one OUT movement "Sale #<id>" per line    │
//! │       ▼                                                                 │
//! │  201 { id, total, createdAt, items: [...] }                            │
//! │                                                                         │
//! │  Any failure ──► whole sale rolled back, 400/404 with error kind       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use stockline_core::validation::validate_page;
use stockline_core::{CoreError, Sale, SaleDetail, SaleLine, ValidationError};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/sales",
            get(list_sales).post(create_sale).delete(cancel_sale_by_query),
        )
        .route("/api/sales/:id", get(get_sale).delete(cancel_sale))
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaleItemRequest {
    pub product_id: i64,
    pub qty: f64,
    /// Unit price charged.
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaleRequest {
    pub items: Vec<SaleItemRequest>,
    /// Defaults to Σ qty × price.
    pub total: Option<f64>,
}

/// Listing window. `id` is only read by `DELETE /api/sales?id=`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaleQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePage {
    pub sales: Vec<SaleDetail>,
    pub total: i64,
    pub has_more: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/sales?limit&offset`, newest first.
async fn list_sales(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SaleQuery>,
) -> Result<Json<SalePage>, ApiError> {
    let (limit, offset) = validate_page(query.limit, query.offset)?;
    let page = state.db.sales().list(limit, offset).await?;

    Ok(Json(SalePage {
        sales: page.items,
        total: page.total,
        has_more: page.has_more,
    }))
}

/// `GET /api/sales/:id`
async fn get_sale(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SaleDetail>, ApiError> {
    let sale = state
        .db
        .sales()
        .get_detail(id)
        .await?
        .ok_or(CoreError::SaleNotFound(id))?;

    Ok(Json(sale))
}

/// `POST /api/sales`
async fn create_sale(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SaleRequest>,
) -> Result<(StatusCode, Json<SaleDetail>), ApiError> {
    let lines: Vec<SaleLine> = body
        .items
        .iter()
        .map(|item| SaleLine {
            product_id: item.product_id,
            qty: item.qty,
            price: item.price,
        })
        .collect();

    let detail = state.ledger.record_sale(&lines, body.total).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `DELETE /api/sales/:id`
async fn cancel_sale(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Sale>, ApiError> {
    let sale = state.ledger.cancel_sale(id).await?;
    Ok(Json(sale))
}

/// `DELETE /api/sales?id=`
async fn cancel_sale_by_query(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SaleQuery>,
) -> Result<Json<Sale>, ApiError> {
    let id = query.id.ok_or_else(|| ValidationError::Required {
        field: "id".to_string(),
    })?;

    let sale = state.ledger.cancel_sale(id).await?;
    Ok(Json(sale))
}
