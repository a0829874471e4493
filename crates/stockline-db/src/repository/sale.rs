//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. RECORD (one unit of work)                                          │
//! │     └── insert_with_items() → Sale + SaleItem per line                 │
//! │     └── one OUT movement per line, "Sale #<id>"                        │
//! │                                                                         │
//! │  2. (OPTIONAL) CANCEL (one unit of work)                               │
//! │     └── one IN movement per line, "Sale cancellation #<id>"            │
//! │     └── delete_with_items() → items, then the sale                     │
//! │                                                                         │
//! │  There is no draft state: a sale row exists only once it is complete.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockline_core::{Page, Sale, SaleDetail, SaleItem, SaleItemView, SaleLine};

const ITEM_VIEW_SELECT: &str = r#"
    SELECT si.*, p.name AS product_name, p.sku AS product_sku
    FROM sale_items si
    INNER JOIN products p ON p.id = si.product_id
"#;

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale header by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        find_by_id(&self.pool, id).await
    }

    /// Gets a sale with its lines.
    pub async fn get_detail(&self, id: i64) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = find_by_id(&self.pool, id).await? else {
            return Ok(None);
        };

        let sql = format!("{ITEM_VIEW_SELECT} WHERE si.sale_id = ?1 ORDER BY si.id");
        let items = sqlx::query_as::<_, SaleItemView>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(SaleDetail { sale, items }))
    }

    /// Lists sales, newest first, each with its lines.
    ///
    /// Headers, lines and the total are read in one transaction so the page
    /// is consistent.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Page<SaleDetail>> {
        debug!(limit = limit, offset = offset, "Listing sales");

        let mut tx = self.pool.begin().await?;

        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;

        // One query for the lines of every sale on the page
        let sql = format!(
            r#"{ITEM_VIEW_SELECT}
            WHERE si.sale_id IN (
                SELECT id FROM sales ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2
            )
            ORDER BY si.id"#
        );
        let items = sqlx::query_as::<_, SaleItemView>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut by_sale: HashMap<i64, Vec<SaleItemView>> = HashMap::new();
        for view in items {
            by_sale.entry(view.item.sale_id).or_default().push(view);
        }

        let details = sales
            .into_iter()
            .map(|sale| {
                let items = by_sale.remove(&sale.id).unwrap_or_default();
                SaleDetail { sale, items }
            })
            .collect();

        Ok(Page::new(details, total, limit, offset))
    }

    /// Counts all sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Fetches a sale header.
pub async fn find_by_id<'e, E>(executor: E, id: i64) -> DbResult<Option<Sale>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(sale)
}

/// Fetches the lines of a sale.
pub async fn items_for<'e, E>(executor: E, sale_id: i64) -> DbResult<Vec<SaleItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let items = sqlx::query_as::<_, SaleItem>(
        "SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY id",
    )
    .bind(sale_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

/// Inserts a sale header and one item per line.
pub async fn insert_with_items(
    conn: &mut SqliteConnection,
    total: f64,
    lines: &[SaleLine],
    now: DateTime<Utc>,
) -> DbResult<(Sale, Vec<SaleItem>)> {
    let sale = sqlx::query_as::<_, Sale>(
        "INSERT INTO sales (total, created_at) VALUES (?1, ?2) RETURNING *",
    )
    .bind(total)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    debug!(sale_id = sale.id, lines = lines.len(), "Inserted sale");

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (sale_id, product_id, qty, price)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(sale.id)
        .bind(line.product_id)
        .bind(line.qty)
        .bind(line.price)
        .fetch_one(&mut *conn)
        .await?;

        items.push(item);
    }

    Ok((sale, items))
}

/// Deletes a sale's items, then the sale. Returns false if no sale was removed.
pub async fn delete_with_items(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<bool> {
    sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    debug!(sale_id = sale_id, "Deleted sale and items");
    Ok(result.rows_affected() > 0)
}
