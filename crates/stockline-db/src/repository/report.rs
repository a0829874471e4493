//! # Report Repository
//!
//! Read-only aggregates for the dashboard.
//!
//! ## Dashboard Summary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  totalProducts   lowStockProducts   totalCategories   totalSuppliers    │
//! │  todaySales      todayRevenue       (since midnight UTC)                │
//! │  recentSales[5]  lowStockProductsList[10]                               │
//! │                                                                         │
//! │  All read in one transaction: the numbers agree with each other.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use stockline_core::{DashboardSummary, LowStockProduct, RecentSale};

const RECENT_SALES: i64 = 5;
const LOW_STOCK_LIST: i64 = 10;

/// Repository for dashboard aggregates.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Builds the dashboard summary as of `now`.
    pub async fn dashboard(&self, now: DateTime<Utc>) -> DbResult<DashboardSummary> {
        let day_start = start_of_day(now);
        debug!(since = %day_start, "Building dashboard summary");

        let mut tx = self.pool.begin().await?;

        let (total_products, low_stock_products): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN stock_qty <= stock_min THEN 1 ELSE 0 END), 0)
            FROM products
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        let total_categories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&mut *tx)
            .await?;

        let total_suppliers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
            .fetch_one(&mut *tx)
            .await?;

        let (today_sales, today_revenue): (i64, f64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total), 0.0) FROM sales WHERE created_at >= ?1",
        )
        .bind(day_start)
        .fetch_one(&mut *tx)
        .await?;

        let recent_sales = sqlx::query_as::<_, RecentSale>(
            r#"
            SELECT s.id, s.total, s.created_at,
                   (SELECT COUNT(*) FROM sale_items si WHERE si.sale_id = s.id) AS items
            FROM sales s
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT ?1
            "#,
        )
        .bind(RECENT_SALES)
        .fetch_all(&mut *tx)
        .await?;

        let low_stock_products_list = sqlx::query_as::<_, LowStockProduct>(
            r#"
            SELECT id, name, stock_qty, stock_min
            FROM products
            WHERE stock_qty <= stock_min
            ORDER BY stock_qty ASC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(LOW_STOCK_LIST)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DashboardSummary {
            total_products,
            low_stock_products,
            total_categories,
            total_suppliers,
            today_sales,
            today_revenue,
            recent_sales,
            low_stock_products_list,
        })
    }
}

/// Midnight UTC of the day containing `now`.
fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_start_of_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 17, 45, 12).unwrap();
        let start = start_of_day(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
    }
}
