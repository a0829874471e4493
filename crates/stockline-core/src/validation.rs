//! # Validation Module
//!
//! Input validation utilities for Stockline.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP body (serde)                                            │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Unknown fields rejected                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Finite, positive and non-negative numbers                         │
//! │  └── Text length and format rules                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Unit of work (stockline-db)                                  │
//! │  ├── Stock preconditions against freshly read rows                     │
//! │  └── UNIQUE / FOREIGN KEY constraints                                  │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use stockline_core::validation::{validate_sku, validate_quantity};
//!
//! // Validate SKU before database insert
//! validate_sku("RICE-1KG").unwrap();
//!
//! // Validate a movement quantity (kg allowed)
//! validate_quantity("qty", 0.75).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, MAX_SALE_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use stockline_core::validation::validate_sku;
///
/// assert!(validate_sku("RICE-1KG").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    // Check for valid characters (alphanumeric, hyphen, underscore)
    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates an optional barcode. Digits only, up to 32 characters.
pub fn validate_barcode(barcode: Option<&str>) -> ValidationResult<()> {
    let Some(barcode) = barcode.map(str::trim).filter(|b| !b.is_empty()) else {
        return Ok(());
    };

    if barcode.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 32,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
///
/// ## Example
/// ```rust
/// use stockline_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Rice 1kg").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 200)
}

/// Validates a required display name (category, supplier, product).
pub fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates optional free text such as a movement reference or description.
pub fn validate_optional_text(field: &str, text: Option<&str>, max: usize) -> ValidationResult<()> {
    match text {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates an optional e-mail address. Only the basic shape is checked.
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    validate_optional_text("email", Some(email), 254)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn ensure_finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a quantity moved or sold.
///
/// ## Rules
/// - Must be finite
/// - Must be positive (> 0); fractions are allowed for weighed goods
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Checkout: add line                                                     │
/// │                                                                         │
/// │  User enters quantity: 0.75 (kg)                                       │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity("qty", 0.75) ← THIS FUNCTION                        │
/// │       │                                                                 │
/// │       ├── NaN / ∞ ? → Error: "qty must be a finite number"             │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "qty must be positive"                    │
/// │       │                                                                 │
/// │       └── OK → Proceed with record_sale                                │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(field: &str, qty: f64) -> ValidationResult<()> {
    ensure_finite(field, qty)?;

    if qty <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a value that must be zero or greater (prices, stock levels).
///
/// ## Example
/// ```rust
/// use stockline_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", 10.99).is_ok());
/// assert!(validate_non_negative("price", 0.0).is_ok());     // Free item
/// assert!(validate_non_negative("price", -1.0).is_err());   // Invalid
/// ```
pub fn validate_non_negative(field: &str, value: f64) -> ValidationResult<()> {
    ensure_finite(field, value)?;

    if value < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a margin or markup percentage.
///
/// ## Rules
/// - Finite and >= 0
/// - At most 10000% (a typo guard)
pub fn validate_margin_pct(margin_pct: f64) -> ValidationResult<()> {
    validate_non_negative("marginPct", margin_pct)?;

    if margin_pct > 10_000.0 {
        return Err(ValidationError::OutOfRange {
            field: "marginPct".to_string(),
            min: 0.0,
            max: 10_000.0,
        });
    }

    Ok(())
}

/// Validates a database id supplied by a client.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a sale.
///
/// ## Rules
/// - At least one line
/// - Must not exceed MAX_SALE_LINES (100)
pub fn validate_sale_size(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1.0,
            max: MAX_SALE_LINES as f64,
        });
    }

    Ok(())
}

/// Normalizes listing window parameters.
///
/// Missing limit becomes DEFAULT_PAGE_LIMIT, missing offset becomes 0.
pub fn validate_page(limit: Option<i64>, offset: Option<i64>) -> ValidationResult<(i64, i64)> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = offset.unwrap_or(0);

    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1.0,
            max: MAX_PAGE_LIMIT as f64,
        });
    }

    if offset < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "offset".to_string(),
        });
    }

    Ok((limit, offset))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        // Valid SKUs
        assert!(validate_sku("RICE-1KG").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        // Invalid SKUs
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode(None).is_ok());
        assert!(validate_barcode(Some("")).is_ok());
        assert!(validate_barcode(Some("7791234567890")).is_ok());
        assert!(validate_barcode(Some("77-91")).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Rice 1kg").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("qty", 1.0).is_ok());
        assert!(validate_quantity("qty", 0.25).is_ok());

        assert!(validate_quantity("qty", 0.0).is_err());
        assert!(validate_quantity("qty", -1.0).is_err());
        assert!(matches!(
            validate_quantity("qty", f64::INFINITY),
            Err(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("price", 0.0).is_ok());
        assert!(validate_non_negative("price", 10.99).is_ok());
        assert!(validate_non_negative("price", -0.01).is_err());
        assert!(validate_non_negative("price", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_margin_pct() {
        assert!(validate_margin_pct(0.0).is_ok());
        assert!(validate_margin_pct(50.0).is_ok());
        assert!(validate_margin_pct(-5.0).is_err());
        assert!(validate_margin_pct(20_000.0).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("sales@acme.com")).is_ok());
        assert!(validate_email(Some("acme.com")).is_err());
        assert!(validate_email(Some("a@b")).is_err());
    }

    #[test]
    fn test_validate_sale_size() {
        assert!(validate_sale_size(0).is_err());
        assert!(validate_sale_size(1).is_ok());
        assert!(validate_sale_size(MAX_SALE_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(None, None).unwrap(), (DEFAULT_PAGE_LIMIT, 0));
        assert_eq!(validate_page(Some(10), Some(20)).unwrap(), (10, 20));
        assert!(validate_page(Some(0), None).is_err());
        assert!(validate_page(Some(10), Some(-1)).is_err());
    }
}
