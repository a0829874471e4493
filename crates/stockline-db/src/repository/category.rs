//! # Category Repository
//!
//! Product categories. Names are unique; a category in use cannot be deleted.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockline_core::Category;

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.name, c.created_at,
           (SELECT COUNT(*) FROM products p WHERE p.category_id = c.id) AS product_count
    FROM categories c
"#;

/// Repository for category reads.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists categories by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let sql = format!("{CATEGORY_SELECT} ORDER BY c.name ASC");
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }

    /// Gets a category by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Category>> {
        find_by_id(&self.pool, id).await
    }

    /// Counts all categories.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Fetches a category with its product count.
pub async fn find_by_id<'e, E>(executor: E, id: i64) -> DbResult<Option<Category>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{CATEGORY_SELECT} WHERE c.id = ?1");
    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(category)
}

/// Inserts a category and returns its id.
pub async fn insert<'e, E>(executor: E, name: &str, now: DateTime<Utc>) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(name = %name, "Inserting category");

    let id: i64 =
        sqlx::query_scalar("INSERT INTO categories (name, created_at) VALUES (?1, ?2) RETURNING id")
            .bind(name)
            .bind(now)
            .fetch_one(executor)
            .await?;

    Ok(id)
}

/// Renames a category. Returns false if the id is unknown.
pub async fn rename<'e, E>(executor: E, id: i64, name: &str) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE categories SET name = ?2 WHERE id = ?1")
        .bind(id)
        .bind(name)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes a category. Returns false if the id is unknown.
pub async fn delete<'e, E>(executor: E, id: i64) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
