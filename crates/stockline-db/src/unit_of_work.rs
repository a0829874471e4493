//! # Unit of Work
//!
//! A scoped transactional context. Every write in Stockline happens inside
//! one.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.begin().await?                                                      │
//! │     ├── wait for the write gate                                        │
//! │     └── BEGIN                                                          │
//! │                                                                         │
//! │  uow.find_product_by_id(..)      ← reads see the latest commit         │
//! │  uow.update_product_stock(..)    ← conditional decrement               │
//! │  uow.insert_movement(..)                                               │
//! │                                                                         │
//! │  uow.commit().await?   → COMMIT, then release the gate                 │
//! │  drop(uow)             → ROLLBACK, then release the gate               │
//! │                          (early `?` return, error, panic)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::error::{DbResult, LedgerResult};
use crate::repository::movement::{self, NewMovement};
use crate::repository::{product, sale};
use stockline_core::{CoreError, Product, Sale, SaleItem, SaleLine, StockMovement};

/// An open transaction holding the database write gate.
///
/// Dropping it without [`commit`](UnitOfWork::commit) rolls back.
pub struct UnitOfWork {
    // Field order matters: the transaction is dropped (rolled back) before
    // the gate is released.
    tx: Transaction<'static, Sqlite>,
    gate: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork").finish_non_exhaustive()
    }
}

impl UnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>, gate: OwnedMutexGuard<()>) -> Self {
        UnitOfWork { tx, gate }
    }

    /// The transaction's connection, for repository functions.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commits every write, then releases the write gate.
    pub async fn commit(self) -> DbResult<()> {
        let UnitOfWork { tx, gate } = self;
        tx.commit().await?;
        drop(gate);
        debug!("Unit of work committed");
        Ok(())
    }

    /// Rolls back explicitly. Dropping has the same effect.
    pub async fn rollback(self) -> DbResult<()> {
        let UnitOfWork { tx, gate } = self;
        tx.rollback().await?;
        drop(gate);
        debug!("Unit of work rolled back");
        Ok(())
    }

    // =========================================================================
    // Persistence operations used by the ledger
    // =========================================================================

    /// Reads a product row inside the transaction.
    pub async fn find_product_by_id(&mut self, id: i64) -> DbResult<Option<Product>> {
        product::find_by_id(&mut *self.tx, id).await
    }

    /// Adds `delta` to a product's stock and returns the updated row.
    ///
    /// ## Errors
    /// - `ProductNotFound` if the product does not exist
    /// - `InsufficientStock` if a decrement would take stock below zero
    pub async fn update_product_stock(&mut self, id: i64, delta: f64) -> LedgerResult<Product> {
        if let Some(updated) = product::apply_stock_delta(&mut *self.tx, id, delta, Utc::now()).await? {
            return Ok(updated);
        }

        // No row changed: tell a missing product from a short one
        match product::find_by_id(&mut *self.tx, id).await? {
            None => Err(CoreError::ProductNotFound(id).into()),
            Some(current) => Err(CoreError::InsufficientStock {
                sku: current.sku,
                available: current.stock_qty,
                requested: -delta,
            }
            .into()),
        }
    }

    /// Appends a stock movement.
    pub async fn insert_movement(&mut self, movement: NewMovement) -> DbResult<StockMovement> {
        movement::insert(&mut *self.tx, &movement, Utc::now()).await
    }

    /// Inserts a sale and its items.
    pub async fn insert_sale(
        &mut self,
        total: f64,
        lines: &[SaleLine],
    ) -> DbResult<(Sale, Vec<SaleItem>)> {
        sale::insert_with_items(&mut self.tx, total, lines, Utc::now()).await
    }

    /// Deletes a sale's items, then the sale.
    pub async fn delete_sale_and_items(&mut self, sale_id: i64) -> DbResult<bool> {
        sale::delete_with_items(&mut self.tx, sale_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::ProductFields;
    use crate::{Database, DbConfig};
    use stockline_core::{MovementType, PricingMode};

    fn fields(sku: &str) -> ProductFields {
        ProductFields {
            sku: sku.to_string(),
            barcode: None,
            name: format!("Product {sku}"),
            description: None,
            category_id: None,
            supplier_id: None,
            purchase_price: 10.0,
            margin_pct: 50.0,
            sale_price: 15.0,
            pricing_mode: PricingMode::Unit,
            package_weight_kg: 1.0,
            stock_min: 0.0,
        }
    }

    async fn seeded(stock: f64) -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut uow = db.begin().await.unwrap();
        let p = product::insert(uow.conn(), &fields("UOW-1"), stock, Utc::now())
            .await
            .unwrap();
        uow.commit().await.unwrap();
        (db, p.id)
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let (db, id) = seeded(5.0).await;

        {
            let mut uow = db.begin().await.unwrap();
            let updated = uow.update_product_stock(id, -2.0).await.unwrap();
            assert_eq!(updated.stock_qty, 3.0);
            // dropped without commit
        }

        let product = db.products().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(product.stock_qty, 5.0);
    }

    #[tokio::test]
    async fn test_commit_persists_both_writes() {
        let (db, id) = seeded(5.0).await;

        let mut uow = db.begin().await.unwrap();
        uow.update_product_stock(id, 1.5).await.unwrap();
        uow.insert_movement(NewMovement {
            product_id: id,
            movement_type: MovementType::In,
            qty: 1.5,
            reference: None,
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();

        let product = db.products().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(product.stock_qty, 6.5);
        assert_eq!(db.movements().for_product(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conditional_decrement() {
        let (db, id) = seeded(1.0).await;

        let mut uow = db.begin().await.unwrap();
        let err = uow.update_product_stock(id, -2.0).await.unwrap_err();
        assert!(matches!(
            err,
            crate::LedgerError::Domain(CoreError::InsufficientStock { available, requested, .. })
                if available == 1.0 && requested == 2.0
        ));

        let err = uow.update_product_stock(9999, -1.0).await.unwrap_err();
        assert!(matches!(
            err,
            crate::LedgerError::Domain(CoreError::ProductNotFound(9999))
        ));
        uow.rollback().await.unwrap();
    }
}
