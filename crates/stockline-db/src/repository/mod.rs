//! # Repository Module
//!
//! Database repository implementations for Stockline.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Route handler                                                         │
//! │       │                                                                 │
//! │       │  db.products().list(&filter)          (reads, on the pool)     │
//! │       │  ledger.record_sale(lines, total)     (writes, in a UnitOfWork)│
//! │       ▼                                                                 │
//! │  ProductRepository / product::apply_stock_delta(&mut conn, ...)        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Each module owns the SQL for one table. Repository structs serve     │
//! │  reads from the pool; the free functions take any executor so the     │
//! │  same SQL runs inside a unit of work.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product listing and lookup
//! - [`movement::MovementRepository`] - Stock movement history
//! - [`sale::SaleRepository`] - Sales with their lines
//! - [`category::CategoryRepository`] - Categories
//! - [`supplier::SupplierRepository`] - Suppliers
//! - [`report::ReportRepository`] - Dashboard aggregates

pub mod category;
pub mod movement;
pub mod product;
pub mod report;
pub mod sale;
pub mod supplier;
