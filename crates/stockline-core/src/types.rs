//! # Domain Types
//!
//! Core domain types used throughout Stockline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  StockMovement  │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │◄──│  product_id     │   │  id (i64)       │       │
//! │  │  sku (unique)   │   │  type IN|OUT    │   │  total          │       │
//! │  │  purchase_price │   │  qty > 0        │   │  created_at     │       │
//! │  │  sale_price     │   │  reference      │   └────────┬────────┘       │
//! │  │  stock_qty      │   └─────────────────┘            │                │
//! │  └────────▲────────┘                          ┌───────▼─────────┐       │
//! │           └───────────────────────────────────│    SaleItem     │       │
//! │                                               │  qty, price     │       │
//! │  ┌─────────────────┐   ┌─────────────────┐    └─────────────────┘       │
//! │  │    Category     │   │    Supplier     │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity is keyed by an integer id assigned by the database.
//! Products additionally carry a unique `sku` and an optional unique
//! `barcode` used at the till.
//!
//! ## Wire Format
//! All types serialize camelCase, matching the JSON contract of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Pricing Mode
// =============================================================================

/// How a product's purchase price relates to what is sold.
///
/// - `Unit`: the purchase price is the cost of one sellable unit
/// - `Weight`: the purchase price is the cost of a whole package of
///   `package_weight_kg` kilograms, sold by the kilogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum PricingMode {
    Unit,
    Weight,
}

impl Default for PricingMode {
    fn default() -> Self {
        PricingMode::Unit
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock received (purchase, cancellation, positive adjustment).
    In,
    /// Stock removed (sale, shrinkage, negative adjustment).
    Out,
}

impl MovementType {
    /// Returns the signed change this movement applies to on-hand stock.
    #[inline]
    pub fn signed(self, qty: f64) -> f64 {
        match self {
            MovementType::In => qty,
            MovementType::Out => -qty,
        }
    }

    /// Wire/database label.
    pub const fn as_str(self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
        }
    }
}

impl std::str::FromStr for MovementType {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            _ => Err(crate::ValidationError::InvalidFormat {
                field: "type".to_string(),
                reason: "must be IN or OUT".to_string(),
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Database identifier.
    pub id: i64,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.), unique when present.
    pub barcode: Option<String>,

    /// Display name.
    pub name: String,

    pub description: Option<String>,

    pub category_id: Option<i64>,

    pub supplier_id: Option<i64>,

    /// What the business pays: per unit, or per package for `Weight`.
    pub purchase_price: f64,

    /// Percentage recorded alongside the sale price.
    pub margin_pct: f64,

    /// Price charged per unit (or per kg for `Weight`).
    pub sale_price: f64,

    pub pricing_mode: PricingMode,

    /// Package size in kg. Stored as 1 for `Unit` products.
    pub package_weight_kg: f64,

    /// On-hand quantity. Fractional for weighed goods.
    pub stock_qty: f64,

    /// Reorder threshold.
    pub stock_min: f64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks if `qty` can be taken out of stock.
    #[inline]
    pub fn can_remove(&self, qty: f64) -> bool {
        self.stock_qty >= qty
    }

    /// True when stock has reached the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_qty <= self.stock_min
    }
}

/// A product row joined with its category and supplier names.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductListing {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub product: Product,
    pub category_name: Option<String>,
    pub supplier_name: Option<String>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// An immutable record of one change to a product's stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub movement_type: MovementType,
    pub qty: f64,
    /// Free-text provenance, e.g. "Sale #12".
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

/// A movement together with the product summary shown in listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MovementEntry {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub movement: StockMovement,
    pub product_name: String,
    pub product_sku: String,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub total: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line item in a sale. `price` is the unit price captured at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub qty: f64,
    pub price: f64,
}

/// A sale item with the product's current name and sku.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItemView {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub item: SaleItem,
    pub product_name: String,
    pub product_sku: String,
}

/// A sale with all of its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItemView>,
}

/// One requested line of a sale, before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLine {
    pub product_id: i64,
    pub qty: f64,
    pub price: f64,
}

impl SaleLine {
    /// Line total (qty × unit price).
    #[inline]
    pub fn line_total(&self) -> f64 {
        self.qty * self.price
    }
}

// =============================================================================
// Category & Supplier
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Number of products filed under this category.
    pub product_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Number of products bought from this supplier.
    pub product_count: i64,
}

// =============================================================================
// Dashboard
// =============================================================================

/// A sale as shown in the dashboard's recent list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecentSale {
    pub id: i64,
    pub total: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Number of lines on the sale.
    pub items: i64,
}

/// A product at or below its reorder threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockProduct {
    pub id: i64,
    pub name: String,
    pub stock_qty: f64,
    pub stock_min: f64,
}

/// Counts shown on the back-office landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardSummary {
    pub total_products: i64,
    /// Products with `stock_qty <= stock_min`.
    pub low_stock_products: i64,
    pub total_categories: i64,
    pub total_suppliers: i64,
    /// Sales since midnight UTC.
    pub today_sales: i64,
    pub today_revenue: f64,
    /// Last 5 sales.
    pub recent_sales: Vec<RecentSale>,
    /// First 10 low-stock products, lowest stock first.
    pub low_stock_products_list: Vec<LowStockProduct>,
}

// =============================================================================
// Listing Pages
// =============================================================================

/// One page of a listing plus the total number of matching rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Builds a page, computing `has_more` from the window.
    pub fn new(items: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Page {
            items,
            total,
            has_more: offset + limit < total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock_qty: f64, stock_min: f64) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            sku: "RICE-1KG".to_string(),
            barcode: None,
            name: "Rice 1kg".to_string(),
            description: None,
            category_id: None,
            supplier_id: None,
            purchase_price: 10.0,
            margin_pct: 50.0,
            sale_price: 15.0,
            pricing_mode: PricingMode::Unit,
            package_weight_kg: 1.0,
            stock_qty,
            stock_min,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_movement_type_signed() {
        assert_eq!(MovementType::In.signed(2.5), 2.5);
        assert_eq!(MovementType::Out.signed(2.5), -2.5);
    }

    #[test]
    fn test_movement_type_parse() {
        assert_eq!("in".parse::<MovementType>().unwrap(), MovementType::In);
        assert_eq!("OUT".parse::<MovementType>().unwrap(), MovementType::Out);
        assert!("sideways".parse::<MovementType>().is_err());
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(serde_json::to_string(&PricingMode::Weight).unwrap(), "\"WEIGHT\"");
        assert_eq!(serde_json::to_string(&MovementType::Out).unwrap(), "\"OUT\"");

        let json = serde_json::to_value(product(3.0, 5.0)).unwrap();
        assert_eq!(json["stockQty"], 3.0);
        assert_eq!(json["pricingMode"], "UNIT");
    }

    #[test]
    fn test_low_stock() {
        assert!(product(5.0, 5.0).is_low_stock());
        assert!(!product(6.0, 5.0).is_low_stock());
        assert!(product(1.0, 0.0).can_remove(1.0));
        assert!(!product(0.5, 0.0).can_remove(1.0));
    }

    #[test]
    fn test_page_has_more() {
        let page = Page::new(vec![1, 2], 5, 2, 0);
        assert!(page.has_more);
        let page = Page::new(vec![5], 5, 2, 4);
        assert!(!page.has_more);
    }

    #[test]
    fn test_pricing_mode_default() {
        assert_eq!(PricingMode::default(), PricingMode::Unit);
    }
}
