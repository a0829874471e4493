//! # Pricing Engine
//!
//! Pure functions deriving unit cost, sale price and margin percentage.
//!
//! ## Two Formulas, On Purpose
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Markup vs Margin                                    │
//! │                                                                         │
//! │  MARKUP (gain over cost)            MARGIN (gain over sale price)       │
//! │  ─────────────────────────────      ─────────────────────────────       │
//! │  sale = round(cost × (1 + m/100))   sale = cost / (1 − m/100)           │
//! │  cost 100, m 50 → 150               cost 100, m 50 → 200                │
//! │                                                                         │
//! │  Used by:                           Used by:                            │
//! │  • product edit recompute           • product creation                  │
//! │  • batch re-pricing tool                                                │
//! │                                                                         │
//! │  Both are kept. Each call site asks for its formula by name through    │
//! │  quote_for_creation / quote_for_edit / quote_for_repricing.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Markup prices are rounded to a whole currency unit, half away from zero
//! (`2.5 → 3`). Inputs are never negative, so this is half-up. Margin prices
//! at creation are stored unrounded.
//!
//! ## Weighed Goods
//! For `PricingMode::Weight` the purchase price is paid per package, so the
//! unit cost is the price of one kilogram: `purchase_price / package_weight_kg`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{PricingMode, Product};

// =============================================================================
// Price Quote
// =============================================================================

/// Normalized price triple derived for a product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PriceQuote {
    /// Cost of one sellable unit (or one kg).
    pub unit_cost: f64,
    pub sale_price: f64,
    pub margin_pct: f64,
}

/// Raw cost attributes of a product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBasis {
    pub purchase_price: f64,
    pub pricing_mode: PricingMode,
    pub package_weight_kg: Option<f64>,
}

impl CostBasis {
    pub fn new(
        purchase_price: f64,
        pricing_mode: PricingMode,
        package_weight_kg: Option<f64>,
    ) -> Self {
        CostBasis {
            purchase_price,
            pricing_mode,
            package_weight_kg,
        }
    }

    /// Cost basis of a stored product.
    pub fn of(product: &Product) -> Self {
        CostBasis {
            purchase_price: product.purchase_price,
            pricing_mode: product.pricing_mode,
            package_weight_kg: Some(product.package_weight_kg),
        }
    }

    /// The unit cost for this basis.
    pub fn unit_cost(&self) -> CoreResult<f64> {
        unit_cost(self.purchase_price, self.pricing_mode, self.package_weight_kg)
    }

    /// Package weight to persist: the effective weight for `Weight`, 1 for `Unit`.
    pub fn stored_package_weight(&self) -> f64 {
        match self.pricing_mode {
            PricingMode::Weight => effective_package_weight(self.package_weight_kg),
            PricingMode::Unit => 1.0,
        }
    }
}

/// What the caller fixed when creating a product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CreationTarget {
    /// Desired margin; the sale price follows from the margin formula.
    Margin(f64),
    /// Desired sale price; the margin is back-derived as a markup.
    SalePrice(f64),
}

// =============================================================================
// Formulas
// =============================================================================

/// Weight used for division: absent, non-positive or non-finite becomes 1.
#[inline]
pub fn effective_package_weight(package_weight_kg: Option<f64>) -> f64 {
    match package_weight_kg {
        Some(w) if w.is_finite() && w > 0.0 => w,
        _ => 1.0,
    }
}

/// Cost of one sellable unit.
///
/// ## Example
/// ```rust
/// use stockline_core::pricing::unit_cost;
/// use stockline_core::PricingMode;
///
/// assert_eq!(unit_cost(12.0, PricingMode::Unit, Some(3.0)).unwrap(), 12.0);
/// assert_eq!(unit_cost(12.0, PricingMode::Weight, Some(3.0)).unwrap(), 4.0);
/// assert_eq!(unit_cost(12.0, PricingMode::Weight, None).unwrap(), 12.0);
/// ```
pub fn unit_cost(
    purchase_price: f64,
    pricing_mode: PricingMode,
    package_weight_kg: Option<f64>,
) -> CoreResult<f64> {
    if !purchase_price.is_finite() || purchase_price < 0.0 {
        return Err(CoreError::invalid(
            "purchase price must be a finite number of zero or more",
        ));
    }

    Ok(match pricing_mode {
        PricingMode::Unit => purchase_price,
        PricingMode::Weight => purchase_price / effective_package_weight(package_weight_kg),
    })
}

/// Rounds half away from zero to a whole currency unit.
#[inline]
pub fn round_price(value: f64) -> f64 {
    value.round()
}

/// Sale price from a markup over cost, rounded.
///
/// `round(unit_cost × (1 + markup_pct / 100))`
///
/// ## Example
/// ```rust
/// use stockline_core::pricing::price_from_markup;
///
/// assert_eq!(price_from_markup(100.0, 50.0), 150.0);
/// assert_eq!(price_from_markup(33.0, 50.0), 50.0); // 49.5 → 50
/// ```
pub fn price_from_markup(unit_cost: f64, markup_pct: f64) -> f64 {
    round_price(unit_cost * (1.0 + markup_pct / 100.0))
}

/// Sale price from a margin on the sale price, unrounded.
///
/// `unit_cost / (1 − margin_pct / 100)`
///
/// ## Errors
/// `InvalidInput` when `margin_pct >= 100` (the divisor reaches zero).
pub fn price_from_margin(unit_cost: f64, margin_pct: f64) -> CoreResult<f64> {
    if !margin_pct.is_finite() || margin_pct >= 100.0 {
        return Err(CoreError::invalid("margin must be below 100%"));
    }
    Ok(unit_cost / (1.0 - margin_pct / 100.0))
}

/// Markup percentage implied by a cost and a sale price.
///
/// `((sale_price − unit_cost) / unit_cost) × 100`
///
/// ## Errors
/// `InvalidInput` when `unit_cost == 0`.
pub fn margin_from_prices(unit_cost: f64, sale_price: f64) -> CoreResult<f64> {
    if unit_cost == 0.0 {
        return Err(CoreError::invalid(
            "cannot derive a margin from a zero unit cost",
        ));
    }
    Ok(((sale_price - unit_cost) / unit_cost) * 100.0)
}

/// Gain as a share of the sale price, the "real margin".
///
/// `((sale_price − unit_cost) / sale_price) × 100`
///
/// ## Errors
/// `InvalidInput` when `sale_price == 0`.
pub fn margin_on_sale_price(unit_cost: f64, sale_price: f64) -> CoreResult<f64> {
    if sale_price == 0.0 {
        return Err(CoreError::invalid(
            "cannot derive a margin from a zero sale price",
        ));
    }
    Ok(((sale_price - unit_cost) / sale_price) * 100.0)
}

// =============================================================================
// Per-Call-Site Quotes
// =============================================================================

/// Quote used when a product is created.
///
/// The margin formula is applied and the result is not rounded. When the
/// caller fixes the sale price instead, the margin is back-derived with
/// [`margin_from_prices`].
pub fn quote_for_creation(basis: CostBasis, target: CreationTarget) -> CoreResult<PriceQuote> {
    let unit_cost = basis.unit_cost()?;

    match target {
        CreationTarget::Margin(margin_pct) => Ok(PriceQuote {
            unit_cost,
            sale_price: price_from_margin(unit_cost, margin_pct)?,
            margin_pct,
        }),
        CreationTarget::SalePrice(sale_price) => Ok(PriceQuote {
            unit_cost,
            sale_price,
            margin_pct: margin_from_prices(unit_cost, sale_price)?,
        }),
    }
}

/// Quote used when a product is edited.
///
/// An explicit sale price wins and is rounded; otherwise the markup formula
/// recomputes it. The margin is recorded as given.
pub fn quote_for_edit(
    basis: CostBasis,
    margin_pct: f64,
    explicit_sale_price: Option<f64>,
) -> CoreResult<PriceQuote> {
    let unit_cost = basis.unit_cost()?;

    let sale_price = match explicit_sale_price {
        Some(price) => round_price(price),
        None => price_from_markup(unit_cost, margin_pct),
    };

    Ok(PriceQuote {
        unit_cost,
        sale_price,
        margin_pct,
    })
}

/// Quote used by batch re-pricing: markup formula, margin set to the markup.
pub fn quote_for_repricing(basis: CostBasis, markup_pct: f64) -> CoreResult<PriceQuote> {
    let unit_cost = basis.unit_cost()?;

    Ok(PriceQuote {
        unit_cost,
        sale_price: price_from_markup(unit_cost, markup_pct),
        margin_pct: markup_pct,
    })
}

// =============================================================================
// Analysis & Verification
// =============================================================================

/// What batch re-pricing would do to one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepriceAnalysis {
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    pub unit_cost: f64,
    pub current_sale_price: f64,
    pub new_sale_price: f64,
    /// Real margin at the current price; `None` for a zero price.
    pub current_real_margin: Option<f64>,
    pub new_real_margin: Option<f64>,
    pub difference: f64,
}

impl RepriceAnalysis {
    /// True when re-pricing would change the stored sale price.
    pub fn changes_price(&self) -> bool {
        self.difference != 0.0
    }
}

/// Computes the re-pricing effect for a product without changing it.
pub fn analyze_repricing(product: &Product, markup_pct: f64) -> CoreResult<RepriceAnalysis> {
    let quote = quote_for_repricing(CostBasis::of(product), markup_pct)?;

    Ok(RepriceAnalysis {
        product_id: product.id,
        sku: product.sku.clone(),
        name: product.name.clone(),
        unit_cost: quote.unit_cost,
        current_sale_price: product.sale_price,
        new_sale_price: quote.sale_price,
        current_real_margin: margin_on_sale_price(quote.unit_cost, product.sale_price).ok(),
        new_real_margin: margin_on_sale_price(quote.unit_cost, quote.sale_price).ok(),
        difference: quote.sale_price - product.sale_price,
    })
}

/// Result of checking a product's markup against an expected percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupCheck {
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    pub unit_cost: f64,
    pub sale_price: f64,
    pub recorded_margin_pct: f64,
    /// `None` when the unit cost is zero.
    pub actual_markup: Option<f64>,
    pub ok: bool,
}

/// Flags a product whose markup deviates from `expected_pct` by `tolerance`
/// points or more.
pub fn verify_markup(product: &Product, expected_pct: f64, tolerance: f64) -> CoreResult<MarkupCheck> {
    let unit_cost = CostBasis::of(product).unit_cost()?;
    let actual_markup = margin_from_prices(unit_cost, product.sale_price).ok();
    let ok = actual_markup
        .map(|actual| (actual - expected_pct).abs() < tolerance)
        .unwrap_or(false);

    Ok(MarkupCheck {
        product_id: product.id,
        sku: product.sku.clone(),
        name: product.name.clone(),
        unit_cost,
        sale_price: product.sale_price,
        recorded_margin_pct: product.margin_pct,
        actual_markup,
        ok,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(purchase_price: f64, mode: PricingMode, weight: f64, sale_price: f64) -> Product {
        let now = Utc::now();
        Product {
            id: 7,
            sku: "FLOUR-5KG".to_string(),
            barcode: None,
            name: "Flour".to_string(),
            description: None,
            category_id: None,
            supplier_id: None,
            purchase_price,
            margin_pct: 50.0,
            sale_price,
            pricing_mode: mode,
            package_weight_kg: weight,
            stock_qty: 0.0,
            stock_min: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_unit_cost_unit_mode_ignores_weight() {
        for p in [0.0, 1.0, 33.0, 1234.5] {
            assert_eq!(unit_cost(p, PricingMode::Unit, Some(4.0)).unwrap(), p);
            assert_eq!(unit_cost(p, PricingMode::Unit, None).unwrap(), p);
        }
    }

    #[test]
    fn test_unit_cost_weight_mode() {
        assert_eq!(unit_cost(40.0, PricingMode::Weight, Some(5.0)).unwrap(), 8.0);
        assert_eq!(unit_cost(40.0, PricingMode::Weight, Some(0.0)).unwrap(), 40.0);
        assert_eq!(unit_cost(40.0, PricingMode::Weight, Some(-2.0)).unwrap(), 40.0);
        assert_eq!(unit_cost(40.0, PricingMode::Weight, None).unwrap(), 40.0);
    }

    #[test]
    fn test_unit_cost_rejects_negative_or_nan() {
        assert!(unit_cost(-1.0, PricingMode::Unit, None).is_err());
        assert!(unit_cost(f64::NAN, PricingMode::Weight, Some(2.0)).is_err());
    }

    #[test]
    fn test_price_from_markup() {
        assert_eq!(price_from_markup(100.0, 50.0), 150.0);
        assert_eq!(price_from_markup(33.0, 50.0), 50.0);
        assert_eq!(price_from_markup(0.0, 50.0), 0.0);
    }

    #[test]
    fn test_price_from_markup_rounds_half_up_not_bankers() {
        assert_eq!(price_from_markup(2.5, 0.0), 3.0);
        assert_eq!(price_from_markup(4.5, 0.0), 5.0);
        assert_eq!(price_from_markup(2.4, 0.0), 2.0);
    }

    #[test]
    fn test_price_from_margin() {
        assert_eq!(price_from_margin(100.0, 50.0).unwrap(), 200.0);
        assert_eq!(price_from_margin(100.0, 0.0).unwrap(), 100.0);
        assert!((price_from_margin(10.0, 30.0).unwrap() - 14.285714285714286).abs() < 1e-9);
    }

    #[test]
    fn test_markup_and_margin_coexist() {
        assert_eq!(price_from_markup(100.0, 50.0), 150.0);
        assert_eq!(price_from_margin(100.0, 50.0).unwrap(), 200.0);
    }

    #[test]
    fn test_price_from_margin_rejects_100_or_more() {
        assert!(matches!(
            price_from_margin(100.0, 100.0),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(price_from_margin(100.0, 150.0).is_err());
    }

    #[test]
    fn test_margin_from_prices() {
        assert_eq!(margin_from_prices(100.0, 150.0).unwrap(), 50.0);
        assert_eq!(margin_from_prices(100.0, 80.0).unwrap(), -20.0);
        assert!(margin_from_prices(0.0, 10.0).is_err());
    }

    #[test]
    fn test_margin_on_sale_price() {
        assert_eq!(margin_on_sale_price(100.0, 200.0).unwrap(), 50.0);
        assert!(margin_on_sale_price(100.0, 0.0).is_err());
    }

    #[test]
    fn test_quote_for_creation_uses_margin_formula() {
        let basis = CostBasis::new(100.0, PricingMode::Unit, None);
        let quote = quote_for_creation(basis, CreationTarget::Margin(50.0)).unwrap();
        assert_eq!(quote.unit_cost, 100.0);
        assert_eq!(quote.sale_price, 200.0);
        assert_eq!(quote.margin_pct, 50.0);

        // Unrounded
        let basis = CostBasis::new(10.0, PricingMode::Unit, None);
        let quote = quote_for_creation(basis, CreationTarget::Margin(30.0)).unwrap();
        assert!(quote.sale_price.fract() != 0.0);
    }

    #[test]
    fn test_quote_for_creation_with_explicit_price() {
        let basis = CostBasis::new(30.0, PricingMode::Weight, Some(3.0));
        let quote = quote_for_creation(basis, CreationTarget::SalePrice(15.0)).unwrap();
        assert_eq!(quote.unit_cost, 10.0);
        assert_eq!(quote.sale_price, 15.0);
        assert_eq!(quote.margin_pct, 50.0);
    }

    #[test]
    fn test_quote_for_edit() {
        let basis = CostBasis::new(33.0, PricingMode::Unit, None);
        assert_eq!(quote_for_edit(basis, 50.0, None).unwrap().sale_price, 50.0);
        assert_eq!(quote_for_edit(basis, 50.0, Some(61.6)).unwrap().sale_price, 62.0);
        assert_eq!(quote_for_edit(basis, 50.0, Some(61.6)).unwrap().margin_pct, 50.0);
    }

    #[test]
    fn test_quote_for_repricing_weight() {
        let basis = CostBasis::new(40.0, PricingMode::Weight, Some(5.0));
        let quote = quote_for_repricing(basis, 50.0).unwrap();
        assert_eq!(quote.unit_cost, 8.0);
        assert_eq!(quote.sale_price, 12.0);
        assert_eq!(quote.margin_pct, 50.0);
    }

    #[test]
    fn test_stored_package_weight() {
        assert_eq!(CostBasis::new(1.0, PricingMode::Unit, Some(5.0)).stored_package_weight(), 1.0);
        assert_eq!(CostBasis::new(1.0, PricingMode::Weight, Some(5.0)).stored_package_weight(), 5.0);
        assert_eq!(CostBasis::new(1.0, PricingMode::Weight, None).stored_package_weight(), 1.0);
    }

    #[test]
    fn test_analyze_repricing() {
        let p = product(100.0, PricingMode::Unit, 1.0, 200.0);
        let analysis = analyze_repricing(&p, 50.0).unwrap();
        assert_eq!(analysis.new_sale_price, 150.0);
        assert_eq!(analysis.difference, -50.0);
        assert_eq!(analysis.current_real_margin, Some(50.0));
        assert!(analysis.changes_price());

        let already = product(100.0, PricingMode::Unit, 1.0, 150.0);
        assert!(!analyze_repricing(&already, 50.0).unwrap().changes_price());
    }

    #[test]
    fn test_verify_markup() {
        let good = product(40.0, PricingMode::Weight, 5.0, 12.0);
        assert!(verify_markup(&good, 50.0, 0.1).unwrap().ok);

        let bad = product(100.0, PricingMode::Unit, 1.0, 200.0);
        let check = verify_markup(&bad, 50.0, 0.1).unwrap();
        assert!(!check.ok);
        assert_eq!(check.actual_markup, Some(100.0));

        let free = product(0.0, PricingMode::Unit, 1.0, 5.0);
        assert!(!verify_markup(&free, 50.0, 0.1).unwrap().ok);
    }
}
