//! # Error Types
//!
//! Domain-specific error types for stockline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockline-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Stable classification shared by every layer    │
//! │                                                                         │
//! │  stockline-db errors (separate crate)                                  │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - CoreError | DbError from a unit of work        │
//! │                                                                         │
//! │  HTTP errors (apps/server)                                             │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → ApiError → Client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, quantities)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorKind`]

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Stable, machine-readable classification of a failure.
///
/// ## Status Mapping
/// ```text
/// InvalidInput       → 400
/// DuplicateKey       → 400
/// InsufficientStock  → 400
/// ProductNotFound    → 404
/// SaleNotFound       → 404
/// NotFound           → 404   (categories, suppliers)
/// PersistenceError   → 500
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidInput,
    ProductNotFound,
    SaleNotFound,
    NotFound,
    InsufficientStock,
    DuplicateKey,
    PersistenceError,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are raised before
/// any write happens, so a caller receiving one never sees partial state.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    /// A category or supplier cannot be found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Insufficient stock to complete a movement or sale.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Re-read stock inside the unit of work: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "RICE-1KG", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, UI shows the message
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: f64,
        requested: f64,
    },

    /// A unique value (sku, barcode, category name) is already taken.
    #[error("{field} '{value}' already exists")]
    DuplicateKey { field: String, value: String },

    /// Numeric input outside the domain of a pricing formula.
    ///
    /// ## When This Occurs
    /// - Margin of 100% or more in the margin formula (division by zero)
    /// - Zero unit cost when back-deriving a markup
    /// - Deleting a product that sales still reference
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidInput error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        CoreError::InvalidInput(reason.into())
    }

    /// Returns the stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_) => ErrorKind::ProductNotFound,
            CoreError::SaleNotFound(_) => ErrorKind::SaleNotFound,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            CoreError::InvalidInput(_) | CoreError::Validation(_) => ErrorKind::InvalidInput,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when request input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// NaN or infinity.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., SKU with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "RICE-1KG".to_string(),
            available: 3.0,
            requested: 5.5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for RICE-1KG: available 3, requested 5.5"
        );
        assert_eq!(CoreError::SaleNotFound(12).to_string(), "Sale not found: 12");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::MustBePositive {
            field: "qty".to_string(),
        };
        assert_eq!(err.to_string(), "qty must be positive");
    }

    #[test]
    fn test_validation_converts_to_invalid_input_kind() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(CoreError::ProductNotFound(1).kind(), ErrorKind::ProductNotFound);
        assert_eq!(CoreError::SaleNotFound(1).kind(), ErrorKind::SaleNotFound);
        assert_eq!(
            CoreError::NotFound { entity: "Category", id: 3 }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::DuplicateKey {
                field: "sku".into(),
                value: "A".into()
            }
            .kind(),
            ErrorKind::DuplicateKey
        );
        assert_eq!(CoreError::invalid("x").kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_kind_wire_format() {
        let json = serde_json::to_string(&ErrorKind::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
