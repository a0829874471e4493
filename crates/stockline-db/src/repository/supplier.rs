//! # Supplier Repository
//!
//! Suppliers products are bought from. A supplier in use cannot be deleted.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockline_core::Supplier;

const SUPPLIER_SELECT: &str = r#"
    SELECT s.id, s.name, s.contact, s.email, s.phone, s.address, s.created_at,
           (SELECT COUNT(*) FROM products p WHERE p.supplier_id = s.id) AS product_count
    FROM suppliers s
"#;

/// Supplier columns written on insert and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplierFields {
    pub name: String,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Repository for supplier reads.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Lists suppliers by name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let sql = format!("{SUPPLIER_SELECT} ORDER BY s.name ASC, s.id ASC");
        let suppliers = sqlx::query_as::<_, Supplier>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(suppliers)
    }

    /// Gets a supplier by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        find_by_id(&self.pool, id).await
    }

    /// Counts all suppliers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Fetches a supplier with its product count.
pub async fn find_by_id<'e, E>(executor: E, id: i64) -> DbResult<Option<Supplier>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SUPPLIER_SELECT} WHERE s.id = ?1");
    let supplier = sqlx::query_as::<_, Supplier>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(supplier)
}

/// Inserts a supplier and returns its id.
pub async fn insert<'e, E>(executor: E, fields: &SupplierFields, now: DateTime<Utc>) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(name = %fields.name, "Inserting supplier");

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO suppliers (name, contact, email, phone, address, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        RETURNING id
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.contact)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(&fields.address)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Overwrites a supplier. Returns false if the id is unknown.
pub async fn update<'e, E>(executor: E, id: i64, fields: &SupplierFields) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE suppliers SET name = ?2, contact = ?3, email = ?4, phone = ?5, address = ?6
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(&fields.name)
    .bind(&fields.contact)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(&fields.address)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes a supplier. Returns false if the id is unknown.
pub async fn delete<'e, E>(executor: E, id: i64) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
