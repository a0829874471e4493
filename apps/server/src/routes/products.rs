//! # Product Routes
//!
//! Catalog listing, product lifecycle and the pricing preview.
//!
//! ## Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product Pricing Flow                                 │
//! │                                                                         │
//! │  Product form                                                           │
//! │       │                                                                 │
//! │       ├── typing ──► POST /api/products/quote  (no write)              │
//! │       │                   formula "creation": margin formula           │
//! │       │                   formula "edit":     markup formula, rounded  │
//! │       │                                                                 │
//! │       ├── save new ──► POST /api/products                              │
//! │       │                   product + "Initial stock" movement, one UoW  │
//! │       │                                                                 │
//! │       └── save edit ──► PUT /api/products/:id                          │
//! │                           stockQty change becomes an adjustment        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use stockline_core::pricing::{CostBasis, CreationTarget};
use stockline_core::validation::validate_search_query;
use stockline_core::{CoreError, PriceQuote, PricingMode, ProductListing, ValidationError};
use stockline_db::ledger::{quote_new_product, quote_product_edit};
use stockline_db::{NewProduct, ProductDraft, ProductFilter, ProductUpdate};

use super::MessageResponse;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/quote", post(quote))
        .route(
            "/api/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Listing filter from the query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductQuery {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

/// Product form as sent by the frontend, for both create and edit.
///
/// On create, exactly one of `marginPct` / `salePrice` fixes the price and
/// `stockQty` is the opening stock. On edit, `marginPct` is required,
/// `salePrice` overrides the markup formula and `stockQty` is the counted
/// quantity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductRequest {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub purchase_price: f64,
    #[serde(default)]
    pub pricing_mode: PricingMode,
    pub package_weight_kg: Option<f64>,
    #[serde(default)]
    pub stock_min: f64,
    pub margin_pct: Option<f64>,
    pub sale_price: Option<f64>,
    pub stock_qty: Option<f64>,
}

impl ProductRequest {
    fn draft(&self) -> ProductDraft {
        ProductDraft {
            sku: self.sku.clone(),
            barcode: self.barcode.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category_id: self.category_id,
            supplier_id: self.supplier_id,
            purchase_price: self.purchase_price,
            pricing_mode: self.pricing_mode,
            package_weight_kg: self.package_weight_kg,
            stock_min: self.stock_min,
        }
    }

    fn into_new_product(self) -> Result<NewProduct, ApiError> {
        let target = creation_target(self.margin_pct, self.sale_price)?;
        Ok(NewProduct {
            draft: self.draft(),
            target,
            initial_qty: self.stock_qty.unwrap_or(0.0),
        })
    }

    fn into_update(self) -> Result<ProductUpdate, ApiError> {
        let margin_pct = self.margin_pct.ok_or_else(|| ValidationError::Required {
            field: "marginPct".to_string(),
        })?;
        Ok(ProductUpdate {
            draft: self.draft(),
            margin_pct,
            sale_price: self.sale_price,
            stock_qty: self.stock_qty,
        })
    }
}

/// Which pricing formula a quote uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteFormula {
    Creation,
    Edit,
}

/// Pricing preview input.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuoteRequest {
    pub formula: QuoteFormula,
    pub purchase_price: f64,
    #[serde(default)]
    pub pricing_mode: PricingMode,
    pub package_weight_kg: Option<f64>,
    pub margin_pct: Option<f64>,
    pub sale_price: Option<f64>,
}

/// Exactly one of margin or sale price must fix a new product's price.
fn creation_target(
    margin_pct: Option<f64>,
    sale_price: Option<f64>,
) -> Result<CreationTarget, ApiError> {
    match (margin_pct, sale_price) {
        (Some(margin), None) => Ok(CreationTarget::Margin(margin)),
        (None, Some(price)) => Ok(CreationTarget::SalePrice(price)),
        (Some(_), Some(_)) => Err(ApiError::invalid(
            "Give either marginPct or salePrice, not both",
        )),
        (None, None) => Err(ApiError::invalid("marginPct or salePrice is required")),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/products?categoryId&search&lowStock`
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Vec<ProductListing>>, ApiError> {
    let search = query
        .search
        .as_deref()
        .map(validate_search_query)
        .transpose()?;

    let filter = ProductFilter {
        category_id: query.category_id,
        search,
        low_stock: query.low_stock,
    };

    let products = state.db.products().list(&filter).await?;
    Ok(Json(products))
}

/// `GET /api/products/:id`
async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ProductListing>, ApiError> {
    let product = state
        .db
        .products()
        .get_listing(id)
        .await?
        .ok_or(CoreError::ProductNotFound(id))?;

    Ok(Json(product))
}

/// `POST /api/products`
async fn create_product(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<(StatusCode, Json<ProductListing>), ApiError> {
    let input = body.into_new_product()?;
    let created = state.ledger.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/products/:id`
async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<Json<ProductListing>, ApiError> {
    let input = body.into_update()?;
    let updated = state.ledger.update_product(id, input).await?;
    Ok(Json(updated))
}

/// `DELETE /api/products/:id`
async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.ledger.delete_product(id).await?;
    Ok(Json(MessageResponse::new("Product deleted")))
}

/// `POST /api/products/quote`
async fn quote(ApiJson(body): ApiJson<QuoteRequest>) -> Result<Json<PriceQuote>, ApiError> {
    let basis = CostBasis::new(body.purchase_price, body.pricing_mode, body.package_weight_kg);

    let quote = match body.formula {
        QuoteFormula::Creation => {
            quote_new_product(basis, creation_target(body.margin_pct, body.sale_price)?)?
        }
        QuoteFormula::Edit => {
            let margin_pct = body.margin_pct.ok_or_else(|| ValidationError::Required {
                field: "marginPct".to_string(),
            })?;
            quote_product_edit(basis, margin_pct, body.sale_price)?
        }
    };

    debug!(formula = ?body.formula, sale_price = quote.sale_price, "Quote computed");
    Ok(Json(quote))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_target_needs_exactly_one() {
        assert_eq!(
            creation_target(Some(30.0), None).unwrap(),
            CreationTarget::Margin(30.0)
        );
        assert_eq!(
            creation_target(None, Some(150.0)).unwrap(),
            CreationTarget::SalePrice(150.0)
        );
        assert!(creation_target(Some(30.0), Some(150.0)).is_err());
        assert!(creation_target(None, None).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let body = r#"{"sku":"A","name":"A","purchasePrice":10,"marginPct":5,"color":"red"}"#;
        assert!(serde_json::from_str::<ProductRequest>(body).is_err());
    }

    #[test]
    fn test_update_requires_margin() {
        let body = r#"{"sku":"A","name":"A","purchasePrice":10}"#;
        let request: ProductRequest = serde_json::from_str(body).unwrap();
        assert!(request.into_update().is_err());
    }
}
