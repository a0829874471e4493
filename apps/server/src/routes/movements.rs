//! Stock movement routes.

use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use stockline_core::validation::{validate_id, validate_page};
use stockline_core::{MovementEntry, MovementType};
use stockline_db::MovementFilter;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/movements", get(list_movements).post(create_movement))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MovementQuery {
    pub product_id: Option<i64>,
    /// `IN` or `OUT`, any case.
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MovementRequest {
    pub product_id: i64,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub qty: f64,
    pub reference: Option<String>,
}

/// One page of the movement history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementPage {
    pub movements: Vec<MovementEntry>,
    pub total: i64,
    pub has_more: bool,
}

/// `GET /api/movements?productId&type&limit&offset`, newest first.
async fn list_movements(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MovementQuery>,
) -> Result<Json<MovementPage>, ApiError> {
    let (limit, offset) = validate_page(query.limit, query.offset)?;
    if let Some(id) = query.product_id {
        validate_id("productId", id)?;
    }

    let movement_type = query
        .movement_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(MovementType::from_str)
        .transpose()?;

    let filter = MovementFilter {
        product_id: query.product_id,
        movement_type,
        limit,
        offset,
    };

    let page = state.db.movements().list(&filter).await?;
    Ok(Json(MovementPage {
        movements: page.items,
        total: page.total,
        has_more: page.has_more,
    }))
}

/// `POST /api/movements`
async fn create_movement(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<MovementRequest>,
) -> Result<(StatusCode, Json<MovementEntry>), ApiError> {
    let entry = state
        .ledger
        .apply_movement(body.product_id, body.movement_type, body.qty, body.reference)
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}
