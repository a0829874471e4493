//! # stockline-core: Pure Business Logic for Stockline
//!
//! This crate is the **heart** of Stockline. It contains the pricing engine
//! and the ledger precondition rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockline Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser Frontend                             │   │
//! │  │    Catalog ──► Movements ──► Checkout ──► Dashboard            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  │    /api/products, /api/movements, /api/sales, ...               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockline-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │  ledger   │  │ validation│  │   │
//! │  │   │  Product  │  │ unit cost │  │ movement  │  │   rules   │  │   │
//! │  │   │   Sale    │  │ markup    │  │ sale lines│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockline-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, units of work, ledger        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, Sale, etc.)
//! - [`pricing`] - Unit cost, markup and margin formulas
//! - [`ledger`] - Preconditions and references for stock mutations
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Named Formulas**: Markup and margin are different formulas with different names
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use stockline_core::pricing::{price_from_markup, unit_cost};
//! use stockline_core::PricingMode;
//!
//! // 5 kg sack bought for 40.00 → 8.00 per kg
//! let cost = unit_cost(40.0, PricingMode::Weight, Some(5.0)).unwrap();
//! assert_eq!(cost, 8.0);
//!
//! // 50% markup, rounded to a whole price
//! assert_eq!(price_from_markup(cost, 50.0), 12.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stockline_core::PriceQuote` instead of
// `use stockline_core::pricing::PriceQuote`

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use pricing::PriceQuote;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Markup applied by the batch re-pricing tool when none is given.
pub const DEFAULT_REPRICE_MARKUP_PCT: f64 = 50.0;

/// Default page size for movement and sale listings.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Largest page a listing will return.
///
/// ## Business Reason
/// Keeps a single request from pulling the whole movement history.
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Maximum number of lines in a single sale.
pub const MAX_SALE_LINES: usize = 100;
