//! # Ledger Rules
//!
//! Pure precondition checks and provenance references for stock mutations.
//! The transactional side lives in `stockline-db::ledger`; every function
//! here is called from inside a unit of work against freshly read rows.
//!
//! ## Sale Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale(lines, total)                                              │
//! │                                                                         │
//! │  1. aggregate_sale_lines   - validate lines, sum qty per product       │
//! │  2. check_stock            - per product, against the fresh row        │
//! │        │                                                                │
//! │        ├── any failure → whole sale rejected, nothing written          │
//! │        ▼                                                                │
//! │  3. sale_total             - supplied total or Σ qty × price           │
//! │  4. write pass             - sale, items, OUT movements "Sale #<id>"   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{MovementType, Product, SaleLine};
use crate::validation::{validate_id, validate_non_negative, validate_quantity, validate_sale_size};

// =============================================================================
// References
// =============================================================================

/// Reference written on the movement created with a product's opening stock.
pub const INITIAL_STOCK_REFERENCE: &str = "Initial stock";

/// Reference written when an edit changes the on-hand quantity.
pub const ADJUSTMENT_REFERENCE: &str = "Manual adjustment";

/// Reference of an OUT movement produced by a sale.
pub fn sale_reference(sale_id: i64) -> String {
    format!("Sale #{sale_id}")
}

/// Reference of an IN movement produced by cancelling a sale.
pub fn cancellation_reference(sale_id: i64) -> String {
    format!("Sale cancellation #{sale_id}")
}

// =============================================================================
// Movement Rules
// =============================================================================

/// Checks that `qty` can be taken from `product`.
///
/// ## Errors
/// `InsufficientStock` carrying the available and requested amounts.
pub fn check_stock(product: &Product, requested: f64) -> CoreResult<()> {
    if !product.can_remove(requested) {
        return Err(CoreError::InsufficientStock {
            sku: product.sku.clone(),
            available: product.stock_qty,
            requested,
        });
    }
    Ok(())
}

/// Validates a movement and returns the stock level it would leave.
pub fn check_movement(product: &Product, movement_type: MovementType, qty: f64) -> CoreResult<f64> {
    validate_quantity("qty", qty)?;

    if movement_type == MovementType::Out {
        check_stock(product, qty)?;
    }

    Ok(product.stock_qty + movement_type.signed(qty))
}

/// The movement that brings stock from `current` to `requested`, if any.
///
/// `requested` must already be validated as non-negative.
pub fn adjustment_for(current: f64, requested: f64) -> Option<(MovementType, f64)> {
    let diff = requested - current;
    if diff > 0.0 {
        Some((MovementType::In, diff))
    } else if diff < 0.0 {
        Some((MovementType::Out, -diff))
    } else {
        None
    }
}

// =============================================================================
// Sale Rules
// =============================================================================

/// Validates every line and sums requested quantity per product.
///
/// Products keep the order of their first line. Two lines for the same
/// product are checked against stock as one request.
pub fn aggregate_sale_lines(lines: &[SaleLine]) -> CoreResult<Vec<(i64, f64)>> {
    validate_sale_size(lines.len())?;

    let mut totals: Vec<(i64, f64)> = Vec::with_capacity(lines.len());
    for line in lines {
        validate_id("productId", line.product_id)?;
        validate_quantity("qty", line.qty)?;
        validate_non_negative("price", line.price)?;

        match totals.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, qty)) => *qty += line.qty,
            None => totals.push((line.product_id, line.qty)),
        }
    }

    Ok(totals)
}

/// The total stored on a sale: the supplied one as given, or Σ qty × price.
pub fn sale_total(lines: &[SaleLine], supplied: Option<f64>) -> CoreResult<f64> {
    match supplied {
        Some(total) => {
            validate_non_negative("total", total)?;
            Ok(total)
        }
        None => Ok(lines.iter().map(SaleLine::line_total).sum()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricingMode;
    use chrono::Utc;

    fn product(stock_qty: f64) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            sku: "SUGAR-1KG".to_string(),
            barcode: None,
            name: "Sugar".to_string(),
            description: None,
            category_id: None,
            supplier_id: None,
            purchase_price: 10.0,
            margin_pct: 50.0,
            sale_price: 15.0,
            pricing_mode: PricingMode::Unit,
            package_weight_kg: 1.0,
            stock_qty,
            stock_min: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(product_id: i64, qty: f64, price: f64) -> SaleLine {
        SaleLine {
            product_id,
            qty,
            price,
        }
    }

    #[test]
    fn test_references() {
        assert_eq!(sale_reference(42), "Sale #42");
        assert_eq!(cancellation_reference(42), "Sale cancellation #42");
    }

    #[test]
    fn test_check_movement() {
        let p = product(5.0);
        assert_eq!(check_movement(&p, MovementType::In, 2.0).unwrap(), 7.0);
        assert_eq!(check_movement(&p, MovementType::Out, 5.0).unwrap(), 0.0);

        let err = check_movement(&p, MovementType::Out, 6.0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available, requested, .. } if available == 5.0 && requested == 6.0
        ));

        assert!(matches!(
            check_movement(&p, MovementType::In, 0.0),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_adjustment_for() {
        assert_eq!(adjustment_for(5.0, 8.0), Some((MovementType::In, 3.0)));
        assert_eq!(adjustment_for(5.0, 2.0), Some((MovementType::Out, 3.0)));
        assert_eq!(adjustment_for(5.0, 5.0), None);
    }

    #[test]
    fn test_aggregate_sale_lines_sums_per_product() {
        let lines = [line(1, 1.0, 10.0), line(2, 2.0, 5.0), line(1, 0.5, 10.0)];
        let totals = aggregate_sale_lines(&lines).unwrap();
        assert_eq!(totals, vec![(1, 1.5), (2, 2.0)]);
    }

    #[test]
    fn test_aggregate_sale_lines_rejects_bad_lines() {
        assert!(aggregate_sale_lines(&[]).is_err());
        assert!(aggregate_sale_lines(&[line(1, 0.0, 10.0)]).is_err());
        assert!(aggregate_sale_lines(&[line(1, 1.0, -1.0)]).is_err());
        assert!(aggregate_sale_lines(&[line(0, 1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_sale_total() {
        let lines = [line(1, 2.0, 10.0), line(2, 0.5, 4.0)];
        assert_eq!(lines[1].line_total(), 2.0);
        assert_eq!(sale_total(&lines, None).unwrap(), 22.0);
        assert_eq!(sale_total(&lines, Some(20.0)).unwrap(), 20.0);
        assert!(sale_total(&lines, Some(-1.0)).is_err());
    }
}
