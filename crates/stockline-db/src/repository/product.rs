//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Filtered catalog listing (category, text search, low stock)
//! - CRUD operations
//! - Conditional stock updates
//!
//! ## Reads vs Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductRepository (pool)          Free functions (any executor)        │
//! │  ───────────────────────────       ─────────────────────────────        │
//! │  get_by_id, list, all, count       find_by_id, insert, update,          │
//! │                                    apply_stock_delta, set_price, delete │
//! │                                                                         │
//! │  Listings read committed data.     Called with a UnitOfWork connection  │
//! │                                    so writes commit together.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Text Search
//! `search` matches name, sku or barcode as a case-insensitive substring.
//! `%` and `_` typed by the user are matched literally.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockline_core::{PricingMode, Product, ProductListing};

const LISTING_SELECT: &str = r#"
    SELECT p.*, c.name AS category_name, s.name AS supplier_name
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN suppliers s ON s.id = p.supplier_id
"#;

// =============================================================================
// Inputs
// =============================================================================

/// Catalog and pricing columns written on insert and update.
///
/// `stock_qty` is not here: it only changes through the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub purchase_price: f64,
    pub margin_pct: f64,
    pub sale_price: f64,
    pub pricing_mode: PricingMode,
    pub package_weight_kg: f64,
    pub stock_min: f64,
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    /// Only products with `stock_qty <= stock_min`.
    pub low_stock: bool,
}

/// Turns user text into a LIKE pattern with `\` as the escape character.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// =============================================================================
// Repository (pool reads)
// =============================================================================

/// Repository for product reads.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // Low-stock products in category 3
/// let products = repo.list(&ProductFilter {
///     category_id: Some(3),
///     low_stock: true,
///     ..Default::default()
/// }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        find_by_id(&self.pool, id).await
    }

    /// Gets a product with its category and supplier names.
    pub async fn get_listing(&self, id: i64) -> DbResult<Option<ProductListing>> {
        find_listing(&self.pool, id).await
    }

    /// Gets a product by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = ?1")
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists products ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<ProductListing>> {
        debug!(
            category_id = ?filter.category_id,
            search = ?filter.search,
            low_stock = filter.low_stock,
            "Listing products"
        );

        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let sql = format!(
            r#"{LISTING_SELECT}
            WHERE (?1 IS NULL OR p.category_id = ?1)
              AND (?2 IS NULL
                   OR p.name LIKE ?2 ESCAPE '\'
                   OR p.sku LIKE ?2 ESCAPE '\'
                   OR p.barcode LIKE ?2 ESCAPE '\')
              AND (?3 = 0 OR p.stock_qty <= p.stock_min)
            ORDER BY p.name ASC, p.id ASC
            "#
        );

        let products = sqlx::query_as::<_, ProductListing>(&sql)
            .bind(filter.category_id)
            .bind(pattern)
            .bind(filter.low_stock)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listing returned products");
        Ok(products)
    }

    /// Every product, by id. Used by batch maintenance.
    pub async fn all(&self) -> DbResult<Vec<Product>> {
        list_all(&self.pool).await
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Executor Functions
// =============================================================================

/// Fetches a product row.
pub async fn find_by_id<'e, E>(executor: E, id: i64) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}

/// Fetches a product with category and supplier names.
pub async fn find_listing<'e, E>(executor: E, id: i64) -> DbResult<Option<ProductListing>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{LISTING_SELECT} WHERE p.id = ?1");

    let listing = sqlx::query_as::<_, ProductListing>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(listing)
}

/// Every product, by id.
pub async fn list_all<'e, E>(executor: E) -> DbResult<Vec<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY id")
        .fetch_all(executor)
        .await?;

    Ok(products)
}

/// Inserts a product with an opening stock level.
pub async fn insert<'e, E>(
    executor: E,
    fields: &ProductFields,
    stock_qty: f64,
    now: DateTime<Utc>,
) -> DbResult<Product>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(sku = %fields.sku, "Inserting product");

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (
            sku, barcode, name, description, category_id, supplier_id,
            purchase_price, margin_pct, sale_price, pricing_mode, package_weight_kg,
            stock_qty, stock_min, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?14
        )
        RETURNING *
        "#,
    )
    .bind(&fields.sku)
    .bind(&fields.barcode)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.category_id)
    .bind(fields.supplier_id)
    .bind(fields.purchase_price)
    .bind(fields.margin_pct)
    .bind(fields.sale_price)
    .bind(fields.pricing_mode)
    .bind(fields.package_weight_kg)
    .bind(stock_qty)
    .bind(fields.stock_min)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(product)
}

/// Overwrites catalog and pricing columns. Returns `None` if the id is unknown.
pub async fn update<'e, E>(
    executor: E,
    id: i64,
    fields: &ProductFields,
    now: DateTime<Utc>,
) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = id, sku = %fields.sku, "Updating product");

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products SET
            sku = ?2,
            barcode = ?3,
            name = ?4,
            description = ?5,
            category_id = ?6,
            supplier_id = ?7,
            purchase_price = ?8,
            margin_pct = ?9,
            sale_price = ?10,
            pricing_mode = ?11,
            package_weight_kg = ?12,
            stock_min = ?13,
            updated_at = ?14
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&fields.sku)
    .bind(&fields.barcode)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.category_id)
    .bind(fields.supplier_id)
    .bind(fields.purchase_price)
    .bind(fields.margin_pct)
    .bind(fields.sale_price)
    .bind(fields.pricing_mode)
    .bind(fields.package_weight_kg)
    .bind(fields.stock_min)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

/// Adds `delta` to on-hand stock.
///
/// A negative delta only applies when `stock_qty >= -delta`. Returns `None`
/// when the product is missing or the stock is short; the caller re-reads
/// the row to tell the two apart.
pub async fn apply_stock_delta<'e, E>(
    executor: E,
    id: i64,
    delta: f64,
    now: DateTime<Utc>,
) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = id, delta = delta, "Applying stock delta");

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products SET
            stock_qty = stock_qty + ?2,
            updated_at = ?3
        WHERE id = ?1 AND (?2 >= 0 OR stock_qty >= -?2)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    Ok(product)
}

/// Stores a new sale price and margin.
pub async fn set_price<'e, E>(
    executor: E,
    id: i64,
    sale_price: f64,
    margin_pct: f64,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE products SET sale_price = ?2, margin_pct = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(id)
    .bind(sale_price)
    .bind(margin_pct)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of sale lines referencing a product.
pub async fn count_sale_items<'e, E>(executor: E, id: i64) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE product_id = ?1")
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// Deletes a product row. Its movements cascade.
pub async fn delete<'e, E>(executor: E, id: i64) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = id, "Deleting product");

    let result = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rice"), "%rice%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
