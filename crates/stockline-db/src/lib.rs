//! # stockline-db: Database Layer for Stockline
//!
//! SQLite storage, units of work and the inventory ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockline Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /api/sales)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockline-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │InventoryLedger│    │  UnitOfWork   │    │ Repositories │  │   │
//! │  │   │   Catalog     │───►│ write gate +  │───►│ product.rs   │  │   │
//! │  │   │ (ledger.rs)   │    │ transaction   │    │ sale.rs ...  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │          ▲                                                      │   │
//! │  │          │ rules from stockline-core (pricing, ledger checks)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, write gate
//! - [`unit_of_work`] - Scoped transaction holding the write gate
//! - [`ledger`] - Stock movements, sales, product lifecycle, re-pricing
//! - [`catalog`] - Category and supplier writes
//! - [`backup`] - JSON and CSV export of the product catalog
//! - [`repository`] - Queries per table
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and ledger error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockline_db::{Database, DbConfig, InventoryLedger};
//! use stockline_core::MovementType;
//!
//! let db = Database::new(DbConfig::new("./stockline.db")).await?;
//! let ledger = InventoryLedger::new(db.clone());
//!
//! ledger.apply_movement(1, MovementType::In, 12.0, Some("Delivery 881".into())).await?;
//! let low = db.products().list(&ProductFilter { low_stock: true, ..Default::default() }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backup;
pub mod catalog;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit_of_work;

// =============================================================================
// Re-exports
// =============================================================================

pub use backup::{BackupError, BackupFiles, ProductBackup};
pub use catalog::Catalog;
pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use ledger::{InventoryLedger, NewProduct, ProductDraft, ProductUpdate};
pub use pool::{Database, DbConfig};
pub use unit_of_work::UnitOfWork;

// Repository re-exports for convenience
pub use repository::movement::{MovementFilter, MovementRepository};
pub use repository::product::{ProductFilter, ProductRepository};
pub use repository::sale::SaleRepository;
pub use repository::supplier::SupplierFields;
