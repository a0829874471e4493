//! # Stock Movement Repository
//!
//! Movements are append-only. They are inserted by the ledger inside a unit
//! of work and removed only by cascade when their product is deleted.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockline_core::{MovementEntry, MovementType, Page, StockMovement};

/// Fields of a movement about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub product_id: i64,
    pub movement_type: MovementType,
    pub qty: f64,
    pub reference: Option<String>,
}

/// Movement listing filter and window.
#[derive(Debug, Clone)]
pub struct MovementFilter {
    pub product_id: Option<i64>,
    pub movement_type: Option<MovementType>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for movement reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Lists movements, newest first, with product name and sku.
    pub async fn list(&self, filter: &MovementFilter) -> DbResult<Page<MovementEntry>> {
        debug!(
            product_id = ?filter.product_id,
            movement_type = ?filter.movement_type,
            limit = filter.limit,
            offset = filter.offset,
            "Listing movements"
        );

        let movements = sqlx::query_as::<_, MovementEntry>(
            r#"
            SELECT m.*, p.name AS product_name, p.sku AS product_sku
            FROM stock_movements m
            INNER JOIN products p ON p.id = m.product_id
            WHERE (?1 IS NULL OR m.product_id = ?1)
              AND (?2 IS NULL OR m.type = ?2)
            ORDER BY m.date DESC, m.id DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.movement_type)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM stock_movements
            WHERE (?1 IS NULL OR product_id = ?1)
              AND (?2 IS NULL OR type = ?2)
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.movement_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(movements, total, filter.limit, filter.offset))
    }

    /// Every movement of a product, oldest first.
    pub async fn for_product(&self, product_id: i64) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_movements WHERE product_id = ?1 ORDER BY date ASC, id ASC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Every movement whose reference is exactly `reference`.
    pub async fn by_reference(&self, reference: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_movements WHERE reference = ?1 ORDER BY id ASC",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

/// Appends one movement row.
pub async fn insert<'e, E>(
    executor: E,
    movement: &NewMovement,
    date: DateTime<Utc>,
) -> DbResult<StockMovement>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        product_id = movement.product_id,
        movement_type = movement.movement_type.as_str(),
        qty = movement.qty,
        "Inserting stock movement"
    );

    let row = sqlx::query_as::<_, StockMovement>(
        r#"
        INSERT INTO stock_movements (product_id, type, qty, reference, date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING *
        "#,
    )
    .bind(movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.qty)
    .bind(&movement.reference)
    .bind(date)
    .fetch_one(executor)
    .await?;

    Ok(row)
}
