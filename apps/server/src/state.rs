//! # Application State
//!
//! Shared handles passed to every axum handler.
//!
//! ## Thread Safety
//! `Database` wraps a `SqlitePool` plus the write gate, both cheap to clone
//! and safe to share. `InventoryLedger` and `Catalog` hold a clone of the
//! same `Database`, so every write from any handler goes through one gate.
//!
//! ## Usage in Handlers
//! ```rust,ignore
//! async fn get_product(
//!     State(state): State<AppState>,
//!     ApiPath(id): ApiPath<i64>,
//! ) -> Result<Json<ProductListing>, ApiError> {
//!     let product = state.db.products().get_listing(id).await?;
//!     ...
//! }
//! ```

use stockline_db::{Catalog, Database, InventoryLedger};

/// Router state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read access through the repositories.
    pub db: Database,

    /// Stock movements, sales and product lifecycle.
    pub ledger: InventoryLedger,

    /// Category and supplier writes.
    pub catalog: Catalog,
}

impl AppState {
    /// Builds the state around an open database.
    pub fn new(db: Database) -> Self {
        AppState {
            ledger: InventoryLedger::new(db.clone()),
            catalog: Catalog::new(db.clone()),
            db,
        }
    }
}
