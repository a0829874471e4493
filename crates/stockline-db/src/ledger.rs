//! # Inventory Ledger
//!
//! Every operation that changes on-hand stock, with its movement history,
//! as one unit of work.
//!
//! ## Ledger Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   stock_qty  ==  Σ IN movements  −  Σ OUT movements                     │
//! │                                                                         │
//! │   Every write below changes stock_qty and appends the matching         │
//! │   movement inside the SAME unit of work:                                │
//! │                                                                         │
//! │   apply_movement   → ±qty            one movement (caller reference)   │
//! │   record_sale      → −qty per line   OUT "Sale #<id>" per line         │
//! │   cancel_sale      → +qty per line   IN "Sale cancellation #<id>"      │
//! │   create_product   → initial qty     IN "Initial stock" (qty > 0)      │
//! │   update_product   → requested qty   IN/OUT "Manual adjustment"        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Preconditions
//! Validation of the request happens first. Preconditions on stored rows
//! (existence, available stock) are evaluated inside the unit of work
//! against freshly read rows. Any failure drops the unit of work, which
//! rolls back everything written so far.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::pool::Database;
use crate::repository::movement::NewMovement;
use crate::repository::product::{self, ProductFields};
use crate::repository::{category, sale, supplier};
use crate::unit_of_work::UnitOfWork;
use stockline_core::ledger::{
    adjustment_for, aggregate_sale_lines, cancellation_reference, check_movement, check_stock,
    sale_reference, sale_total, ADJUSTMENT_REFERENCE, INITIAL_STOCK_REFERENCE,
};
use stockline_core::pricing::{
    self, CostBasis, CreationTarget, MarkupCheck, PriceQuote, RepriceAnalysis,
};
use stockline_core::validation::{
    validate_barcode, validate_id, validate_margin_pct, validate_non_negative,
    validate_optional_text, validate_product_name, validate_quantity, validate_sku,
};
use stockline_core::{
    CoreError, MovementEntry, MovementType, PricingMode, Product, ProductListing, Sale,
    SaleDetail, SaleItemView, SaleLine,
};

const MAX_DESCRIPTION_LEN: usize = 1000;
const MAX_REFERENCE_LEN: usize = 200;

// =============================================================================
// Inputs
// =============================================================================

/// Catalog and cost attributes shared by product creation and edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub purchase_price: f64,
    pub pricing_mode: PricingMode,
    /// Package weight for weighed goods. Absent or non-positive means 1 kg.
    pub package_weight_kg: Option<f64>,
    pub stock_min: f64,
}

impl ProductDraft {
    fn validate(&self) -> LedgerResult<()> {
        validate_sku(&self.sku)?;
        validate_barcode(self.barcode.as_deref())?;
        validate_product_name(&self.name)?;
        validate_optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        validate_non_negative("purchasePrice", self.purchase_price)?;
        validate_non_negative("stockMin", self.stock_min)?;

        if let Some(id) = self.category_id {
            validate_id("categoryId", id)?;
        }
        if let Some(id) = self.supplier_id {
            validate_id("supplierId", id)?;
        }

        Ok(())
    }

    /// Cost attributes used by the pricing formulas.
    pub fn basis(&self) -> CostBasis {
        CostBasis::new(self.purchase_price, self.pricing_mode, self.package_weight_kg)
    }

    /// Normalized columns for a priced draft.
    fn to_fields(&self, quote: &PriceQuote) -> ProductFields {
        ProductFields {
            sku: self.sku.trim().to_string(),
            barcode: non_empty(self.barcode.as_deref()),
            name: self.name.trim().to_string(),
            description: non_empty(self.description.as_deref()),
            category_id: self.category_id,
            supplier_id: self.supplier_id,
            purchase_price: self.purchase_price,
            margin_pct: quote.margin_pct,
            sale_price: quote.sale_price,
            pricing_mode: self.pricing_mode,
            package_weight_kg: self.basis().stored_package_weight(),
            stock_min: self.stock_min,
        }
    }
}

/// A product to create, priced with the creation formula.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub draft: ProductDraft,
    pub target: CreationTarget,
    /// Opening stock. Recorded as an "Initial stock" movement when > 0.
    pub initial_qty: f64,
}

/// A full product edit, priced with the edit formula.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub draft: ProductDraft,
    pub margin_pct: f64,
    /// Explicit sale price. Rounded; when absent the markup formula applies.
    pub sale_price: Option<f64>,
    /// Requested on-hand quantity. A difference becomes an adjustment movement.
    pub stock_qty: Option<f64>,
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Prices a new product, validating the target first.
pub fn quote_new_product(basis: CostBasis, target: CreationTarget) -> LedgerResult<PriceQuote> {
    match target {
        CreationTarget::Margin(margin_pct) => validate_margin_pct(margin_pct)?,
        CreationTarget::SalePrice(sale_price) => validate_non_negative("salePrice", sale_price)?,
    }
    Ok(pricing::quote_for_creation(basis, target)?)
}

/// Prices an edited product, validating the margin and explicit price first.
pub fn quote_product_edit(
    basis: CostBasis,
    margin_pct: f64,
    sale_price: Option<f64>,
) -> LedgerResult<PriceQuote> {
    validate_margin_pct(margin_pct)?;
    if let Some(price) = sale_price {
        validate_non_negative("salePrice", price)?;
    }
    Ok(pricing::quote_for_edit(basis, margin_pct, sale_price)?)
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Turns a UNIQUE violation on a product into `DuplicateKey` with the
/// offending value.
fn product_conflict(err: DbError, fields: &ProductFields) -> LedgerError {
    match err {
        DbError::UniqueViolation { field, .. } => {
            let value = match field.as_str() {
                "barcode" => fields.barcode.clone().unwrap_or_default(),
                _ => fields.sku.clone(),
            };
            CoreError::DuplicateKey { field, value }.into()
        }
        other => other.into(),
    }
}

fn log_failure(operation: &'static str, err: &LedgerError) {
    match err {
        LedgerError::Domain(e) => warn!(operation = operation, error = %e, "Ledger operation rejected"),
        LedgerError::Persistence(e) => {
            error!(operation = operation, error = %e, "Ledger operation failed")
        }
    }
}

/// Fails with `NotFound` when a referenced category or supplier is missing.
async fn check_references(uow: &mut UnitOfWork, fields: &ProductFields) -> LedgerResult<()> {
    if let Some(id) = fields.category_id {
        if category::find_by_id(uow.conn(), id).await?.is_none() {
            return Err(CoreError::NotFound {
                entity: "Category",
                id,
            }
            .into());
        }
    }

    if let Some(id) = fields.supplier_id {
        if supplier::find_by_id(uow.conn(), id).await?.is_none() {
            return Err(CoreError::NotFound {
                entity: "Supplier",
                id,
            }
            .into());
        }
    }

    Ok(())
}

async fn load_product(uow: &mut UnitOfWork, id: i64) -> LedgerResult<Product> {
    uow.find_product_by_id(id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id).into())
}

async fn load_listing(uow: &mut UnitOfWork, id: i64) -> LedgerResult<ProductListing> {
    product::find_listing(uow.conn(), id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id).into())
}

// =============================================================================
// Inventory Ledger
// =============================================================================

/// Transactional stock operations over a [`Database`].
///
/// ## Usage
/// ```rust,ignore
/// let ledger = InventoryLedger::new(db.clone());
///
/// let detail = ledger
///     .record_sale(&[SaleLine { product_id: 1, qty: 2.0, price: 150.0 }], None)
///     .await?;
/// assert_eq!(detail.sale.total, 300.0);
/// ```
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    db: Database,
}

impl InventoryLedger {
    /// Creates a ledger over a database handle.
    pub fn new(db: Database) -> Self {
        InventoryLedger { db }
    }

    /// The underlying database handle, for reads.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Movements
    // =========================================================================

    /// Adds or removes stock and records one movement.
    ///
    /// ## Errors
    /// - `InvalidInput` if `qty` is not positive
    /// - `ProductNotFound` if the product does not exist
    /// - `InsufficientStock` if an OUT exceeds on-hand stock
    pub async fn apply_movement(
        &self,
        product_id: i64,
        movement_type: MovementType,
        qty: f64,
        reference: Option<String>,
    ) -> LedgerResult<MovementEntry> {
        self.try_apply_movement(product_id, movement_type, qty, reference)
            .await
            .inspect_err(|e| log_failure("apply_movement", e))
    }

    async fn try_apply_movement(
        &self,
        product_id: i64,
        movement_type: MovementType,
        qty: f64,
        reference: Option<String>,
    ) -> LedgerResult<MovementEntry> {
        validate_id("productId", product_id)?;
        validate_quantity("qty", qty)?;
        let reference = non_empty(reference.as_deref());
        validate_optional_text("reference", reference.as_deref(), MAX_REFERENCE_LEN)?;

        let mut uow = self.db.begin().await?;

        let current = load_product(&mut uow, product_id).await?;
        let expected = check_movement(&current, movement_type, qty)?;

        let updated = uow
            .update_product_stock(product_id, movement_type.signed(qty))
            .await?;
        let movement = uow
            .insert_movement(NewMovement {
                product_id,
                movement_type,
                qty,
                reference,
            })
            .await?;

        uow.commit().await?;

        info!(
            product_id = product_id,
            movement_type = movement_type.as_str(),
            qty = qty,
            stock_qty = updated.stock_qty,
            expected = expected,
            "Stock movement applied"
        );

        Ok(MovementEntry {
            movement,
            product_name: updated.name,
            product_sku: updated.sku,
        })
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale, decrementing stock for every line.
    ///
    /// All products are checked before anything is written; lines for the
    /// same product are checked against their summed quantity. `total`
    /// defaults to Σ qty × price.
    ///
    /// ## Errors
    /// - `InvalidInput` for an empty sale or a bad line
    /// - `ProductNotFound` for an unknown product
    /// - `InsufficientStock` naming the first product that falls short
    pub async fn record_sale(
        &self,
        lines: &[SaleLine],
        total: Option<f64>,
    ) -> LedgerResult<SaleDetail> {
        self.try_record_sale(lines, total)
            .await
            .inspect_err(|e| log_failure("record_sale", e))
    }

    async fn try_record_sale(
        &self,
        lines: &[SaleLine],
        total: Option<f64>,
    ) -> LedgerResult<SaleDetail> {
        let requested = aggregate_sale_lines(lines)?;
        let total = sale_total(lines, total)?;

        let mut uow = self.db.begin().await?;

        // Pre-check pass: nothing is written until every product passes
        let mut products: HashMap<i64, Product> = HashMap::with_capacity(requested.len());
        for (product_id, qty) in requested {
            let product = load_product(&mut uow, product_id).await?;
            check_stock(&product, qty)?;
            products.insert(product_id, product);
        }

        // Write pass
        let (sale, items) = uow.insert_sale(total, lines).await?;
        let reference = sale_reference(sale.id);

        for line in lines {
            uow.update_product_stock(line.product_id, -line.qty).await?;
            uow.insert_movement(NewMovement {
                product_id: line.product_id,
                movement_type: MovementType::Out,
                qty: line.qty,
                reference: Some(reference.clone()),
            })
            .await?;
        }

        uow.commit().await?;

        info!(
            sale_id = sale.id,
            total = sale.total,
            lines = lines.len(),
            "Sale recorded"
        );

        let items = items
            .into_iter()
            .map(|item| {
                let (product_name, product_sku) = products
                    .get(&item.product_id)
                    .map(|p| (p.name.clone(), p.sku.clone()))
                    .unwrap_or_default();
                SaleItemView {
                    item,
                    product_name,
                    product_sku,
                }
            })
            .collect();

        Ok(SaleDetail { sale, items })
    }

    /// Cancels a sale: restocks every line, then deletes the sale.
    ///
    /// ## Errors
    /// - `SaleNotFound` if the sale does not exist
    pub async fn cancel_sale(&self, sale_id: i64) -> LedgerResult<Sale> {
        self.try_cancel_sale(sale_id)
            .await
            .inspect_err(|e| log_failure("cancel_sale", e))
    }

    async fn try_cancel_sale(&self, sale_id: i64) -> LedgerResult<Sale> {
        validate_id("saleId", sale_id)?;

        let mut uow = self.db.begin().await?;

        let cancelled = sale::find_by_id(uow.conn(), sale_id)
            .await?
            .ok_or(CoreError::SaleNotFound(sale_id))?;
        let items = sale::items_for(uow.conn(), sale_id).await?;
        let reference = cancellation_reference(sale_id);

        for item in &items {
            uow.update_product_stock(item.product_id, item.qty).await?;
            uow.insert_movement(NewMovement {
                product_id: item.product_id,
                movement_type: MovementType::In,
                qty: item.qty,
                reference: Some(reference.clone()),
            })
            .await?;
        }

        uow.delete_sale_and_items(sale_id).await?;
        uow.commit().await?;

        info!(sale_id = sale_id, lines = items.len(), "Sale cancelled");
        Ok(cancelled)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product and its opening stock movement together.
    ///
    /// ## Errors
    /// - `InvalidInput` for bad fields or a margin of 100% or more
    /// - `DuplicateKey` for a taken sku or barcode
    /// - `NotFound` for an unknown category or supplier
    pub async fn create_product(&self, input: NewProduct) -> LedgerResult<ProductListing> {
        self.try_create_product(input)
            .await
            .inspect_err(|e| log_failure("create_product", e))
    }

    async fn try_create_product(&self, input: NewProduct) -> LedgerResult<ProductListing> {
        input.draft.validate()?;
        validate_non_negative("stockQty", input.initial_qty)?;

        let quote = quote_new_product(input.draft.basis(), input.target)?;
        let fields = input.draft.to_fields(&quote);

        let mut uow = self.db.begin().await?;
        check_references(&mut uow, &fields).await?;

        let created = product::insert(uow.conn(), &fields, input.initial_qty, Utc::now())
            .await
            .map_err(|e| product_conflict(e, &fields))?;

        if input.initial_qty > 0.0 {
            uow.insert_movement(NewMovement {
                product_id: created.id,
                movement_type: MovementType::In,
                qty: input.initial_qty,
                reference: Some(INITIAL_STOCK_REFERENCE.to_string()),
            })
            .await?;
        }

        let listing = load_listing(&mut uow, created.id).await?;
        uow.commit().await?;

        info!(
            product_id = created.id,
            sku = %created.sku,
            sale_price = created.sale_price,
            initial_qty = input.initial_qty,
            "Product created"
        );
        Ok(listing)
    }

    /// Edits a product. A changed `stock_qty` is applied as one adjustment
    /// movement.
    ///
    /// ## Errors
    /// - `ProductNotFound` if the product does not exist
    /// - `DuplicateKey` for a sku or barcode taken by another product
    /// - `NotFound` for an unknown category or supplier
    pub async fn update_product(&self, id: i64, input: ProductUpdate) -> LedgerResult<ProductListing> {
        self.try_update_product(id, input)
            .await
            .inspect_err(|e| log_failure("update_product", e))
    }

    async fn try_update_product(&self, id: i64, input: ProductUpdate) -> LedgerResult<ProductListing> {
        validate_id("id", id)?;
        input.draft.validate()?;
        if let Some(qty) = input.stock_qty {
            validate_non_negative("stockQty", qty)?;
        }

        let quote = quote_product_edit(input.draft.basis(), input.margin_pct, input.sale_price)?;
        let fields = input.draft.to_fields(&quote);

        let mut uow = self.db.begin().await?;

        let current = load_product(&mut uow, id).await?;
        check_references(&mut uow, &fields).await?;

        product::update(uow.conn(), id, &fields, Utc::now())
            .await
            .map_err(|e| product_conflict(e, &fields))?
            .ok_or(CoreError::ProductNotFound(id))?;

        let adjustment = input
            .stock_qty
            .and_then(|requested| adjustment_for(current.stock_qty, requested));

        if let Some((movement_type, qty)) = adjustment {
            uow.update_product_stock(id, movement_type.signed(qty)).await?;
            uow.insert_movement(NewMovement {
                product_id: id,
                movement_type,
                qty,
                reference: Some(ADJUSTMENT_REFERENCE.to_string()),
            })
            .await?;
        }

        let listing = load_listing(&mut uow, id).await?;
        uow.commit().await?;

        info!(
            product_id = id,
            sale_price = listing.product.sale_price,
            adjusted = adjustment.is_some(),
            "Product updated"
        );
        Ok(listing)
    }

    /// Deletes a product and its movement history.
    ///
    /// ## Errors
    /// - `ProductNotFound` if the product does not exist
    /// - `InvalidInput` if any sale references the product
    pub async fn delete_product(&self, id: i64) -> LedgerResult<()> {
        self.try_delete_product(id)
            .await
            .inspect_err(|e| log_failure("delete_product", e))
    }

    async fn try_delete_product(&self, id: i64) -> LedgerResult<()> {
        validate_id("id", id)?;

        let mut uow = self.db.begin().await?;

        let current = load_product(&mut uow, id).await?;

        if product::count_sale_items(uow.conn(), id).await? > 0 {
            return Err(CoreError::invalid(format!(
                "product {} has sales and cannot be deleted",
                current.sku
            ))
            .into());
        }

        product::delete(uow.conn(), id).await?;
        uow.commit().await?;

        info!(product_id = id, sku = %current.sku, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Batch Re-pricing
    // =========================================================================

    /// Re-prices every product with the markup formula, in one unit of work.
    ///
    /// Only products whose sale price changes are written and reported; a
    /// product already at the markup price keeps its recorded margin. A
    /// second run with the same markup returns nothing.
    pub async fn reprice_all(&self, markup_pct: f64) -> LedgerResult<Vec<RepriceAnalysis>> {
        self.try_reprice_all(markup_pct)
            .await
            .inspect_err(|e| log_failure("reprice_all", e))
    }

    async fn try_reprice_all(&self, markup_pct: f64) -> LedgerResult<Vec<RepriceAnalysis>> {
        validate_margin_pct(markup_pct)?;

        let mut uow = self.db.begin().await?;

        let products = product::list_all(uow.conn()).await?;
        let now = Utc::now();
        let mut changed = Vec::new();

        for current in &products {
            let analysis = pricing::analyze_repricing(current, markup_pct)?;
            if !analysis.changes_price() {
                continue;
            }

            product::set_price(uow.conn(), current.id, analysis.new_sale_price, markup_pct, now)
                .await?;
            changed.push(analysis);
        }

        uow.commit().await?;

        info!(
            markup_pct = markup_pct,
            products = products.len(),
            updated = changed.len(),
            "Products re-priced"
        );
        Ok(changed)
    }

    /// What [`reprice_all`](Self::reprice_all) would do, without writing.
    pub async fn preview_repricing(&self, markup_pct: f64) -> LedgerResult<Vec<RepriceAnalysis>> {
        validate_margin_pct(markup_pct)?;

        let products = self.db.products().all().await?;
        let analyses = products
            .iter()
            .map(|p| pricing::analyze_repricing(p, markup_pct))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(analyses)
    }

    /// Checks every product's markup against `expected_pct`.
    pub async fn verify_markups(
        &self,
        expected_pct: f64,
        tolerance: f64,
    ) -> LedgerResult<Vec<MarkupCheck>> {
        let products = self.db.products().all().await?;
        let checks = products
            .iter()
            .map(|p| pricing::verify_markup(p, expected_pct, tolerance))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(checks)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use stockline_core::ErrorKind;

    async fn ledger() -> InventoryLedger {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        InventoryLedger::new(db)
    }

    fn draft(sku: &str, purchase_price: f64) -> ProductDraft {
        ProductDraft {
            sku: sku.to_string(),
            barcode: None,
            name: format!("Product {sku}"),
            description: None,
            category_id: None,
            supplier_id: None,
            purchase_price,
            pricing_mode: PricingMode::Unit,
            package_weight_kg: None,
            stock_min: 0.0,
        }
    }

    async fn create(ledger: &InventoryLedger, sku: &str, initial_qty: f64) -> Product {
        ledger
            .create_product(NewProduct {
                draft: draft(sku, 100.0),
                target: CreationTarget::Margin(50.0),
                initial_qty,
            })
            .await
            .unwrap()
            .product
    }

    async fn stock_of(ledger: &InventoryLedger, id: i64) -> f64 {
        ledger
            .database()
            .products()
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .stock_qty
    }

    fn line(product_id: i64, qty: f64, price: f64) -> SaleLine {
        SaleLine {
            product_id,
            qty,
            price,
        }
    }

    #[tokio::test]
    async fn test_create_product_uses_margin_formula_and_initial_movement() {
        let ledger = ledger().await;
        let product = create(&ledger, "RICE-1KG", 10.0).await;

        assert_eq!(product.sale_price, 200.0);
        assert_eq!(product.margin_pct, 50.0);
        assert_eq!(product.stock_qty, 10.0);

        let movements = ledger.database().movements().for_product(product.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::In);
        assert_eq!(movements[0].qty, 10.0);
        assert_eq!(movements[0].reference.as_deref(), Some(INITIAL_STOCK_REFERENCE));
    }

    #[tokio::test]
    async fn test_create_product_without_stock_has_no_movement() {
        let ledger = ledger().await;
        let product = create(&ledger, "EMPTY-1", 0.0).await;

        let movements = ledger.database().movements().for_product(product.id).await.unwrap();
        assert!(movements.is_empty());
    }

    #[tokio::test]
    async fn test_create_weighed_product() {
        let ledger = ledger().await;
        let mut weighed = draft("FLOUR-5KG", 40.0);
        weighed.pricing_mode = PricingMode::Weight;
        weighed.package_weight_kg = Some(5.0);

        let listing = ledger
            .create_product(NewProduct {
                draft: weighed,
                target: CreationTarget::Margin(50.0),
                initial_qty: 0.0,
            })
            .await
            .unwrap();

        // 40 / 5 = 8 per kg, 8 / 0.5 = 16
        assert_eq!(listing.product.sale_price, 16.0);
        assert_eq!(listing.product.package_weight_kg, 5.0);
    }

    #[tokio::test]
    async fn test_create_product_rejects_duplicate_sku() {
        let ledger = ledger().await;
        create(&ledger, "DUP-1", 0.0).await;

        let err = ledger
            .create_product(NewProduct {
                draft: draft("DUP-1", 10.0),
                target: CreationTarget::Margin(10.0),
                initial_qty: 5.0,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::DuplicateKey { ref field, ref value })
                if field == "sku" && value == "DUP-1"
        ));
        assert_eq!(ledger.database().products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_product_rejects_full_margin_and_unknown_category() {
        let ledger = ledger().await;

        let err = ledger
            .create_product(NewProduct {
                draft: draft("M-100", 10.0),
                target: CreationTarget::Margin(100.0),
                initial_qty: 0.0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut orphan = draft("ORPHAN-1", 10.0);
        orphan.category_id = Some(42);
        let err = ledger
            .create_product(NewProduct {
                draft: orphan,
                target: CreationTarget::Margin(10.0),
                initial_qty: 3.0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(ledger.database().products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_out_larger_than_stock_is_rejected() {
        let ledger = ledger().await;
        let product = create(&ledger, "SHORT-1", 2.0).await;

        let err = ledger
            .apply_movement(product.id, MovementType::Out, 3.0, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(stock_of(&ledger, product.id).await, 2.0);
        let movements = ledger.database().movements().for_product(product.id).await.unwrap();
        assert_eq!(movements.len(), 1);
    }

    #[tokio::test]
    async fn test_in_then_out_returns_to_original() {
        let ledger = ledger().await;
        let product = create(&ledger, "ROUND-1", 0.0).await;

        let entry = ledger
            .apply_movement(product.id, MovementType::In, 4.5, Some("Delivery 7".to_string()))
            .await
            .unwrap();
        assert_eq!(entry.product_sku, "ROUND-1");
        assert_eq!(entry.movement.reference.as_deref(), Some("Delivery 7"));

        ledger
            .apply_movement(product.id, MovementType::Out, 4.5, None)
            .await
            .unwrap();

        assert_eq!(stock_of(&ledger, product.id).await, 0.0);
        let movements = ledger.database().movements().for_product(product.id).await.unwrap();
        assert_eq!(movements.len(), 2);
    }

    #[tokio::test]
    async fn test_movement_validation() {
        let ledger = ledger().await;
        let product = create(&ledger, "VAL-1", 1.0).await;

        let err = ledger
            .apply_movement(product.id, MovementType::In, 0.0, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = ledger
            .apply_movement(9999, MovementType::In, 1.0, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductNotFound);
    }

    #[tokio::test]
    async fn test_record_sale_decrements_and_references() {
        let ledger = ledger().await;
        let a = create(&ledger, "SALE-A", 10.0).await;
        let b = create(&ledger, "SALE-B", 5.0).await;

        let detail = ledger
            .record_sale(&[line(a.id, 2.0, 200.0), line(b.id, 1.5, 10.0)], None)
            .await
            .unwrap();

        assert_eq!(detail.sale.total, 415.0);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].product_sku, "SALE-A");
        assert_eq!(stock_of(&ledger, a.id).await, 8.0);
        assert_eq!(stock_of(&ledger, b.id).await, 3.5);

        let reference = sale_reference(detail.sale.id);
        let movements = ledger.database().movements().by_reference(&reference).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements.iter().all(|m| m.movement_type == MovementType::Out));
    }

    #[tokio::test]
    async fn test_record_sale_keeps_supplied_total() {
        let ledger = ledger().await;
        let a = create(&ledger, "TOTAL-1", 10.0).await;

        let detail = ledger
            .record_sale(&[line(a.id, 2.0, 200.0)], Some(350.0))
            .await
            .unwrap();
        assert_eq!(detail.sale.total, 350.0);
    }

    #[tokio::test]
    async fn test_two_line_sale_with_short_second_line_is_rejected() {
        let ledger = ledger().await;
        let a = create(&ledger, "TWO-A", 10.0).await;
        let b = create(&ledger, "TWO-B", 1.0).await;

        let err = ledger
            .record_sale(&[line(a.id, 2.0, 1.0), line(b.id, 2.0, 1.0)], None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(stock_of(&ledger, a.id).await, 10.0);
        assert_eq!(stock_of(&ledger, b.id).await, 1.0);
        assert_eq!(ledger.database().sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sale_lines_for_same_product_are_summed() {
        let ledger = ledger().await;
        let a = create(&ledger, "SUM-1", 3.0).await;

        let err = ledger
            .record_sale(&[line(a.id, 2.0, 1.0), line(a.id, 2.0, 1.0)], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(stock_of(&ledger, a.id).await, 3.0);
    }

    #[tokio::test]
    async fn test_sale_with_unknown_product_is_rejected() {
        let ledger = ledger().await;
        let a = create(&ledger, "KNOWN-1", 3.0).await;

        let err = ledger
            .record_sale(&[line(a.id, 1.0, 1.0), line(777, 1.0, 1.0)], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductNotFound);
        assert_eq!(stock_of(&ledger, a.id).await, 3.0);

        let err = ledger.record_sale(&[], None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_cancel_sale_restores_stock() {
        let ledger = ledger().await;
        let a = create(&ledger, "CANCEL-A", 10.0).await;
        let b = create(&ledger, "CANCEL-B", 4.0).await;

        let detail = ledger
            .record_sale(&[line(a.id, 3.0, 1.0), line(b.id, 4.0, 1.0)], None)
            .await
            .unwrap();
        let sale_id = detail.sale.id;

        let cancelled = ledger.cancel_sale(sale_id).await.unwrap();
        assert_eq!(cancelled.id, sale_id);

        assert_eq!(stock_of(&ledger, a.id).await, 10.0);
        assert_eq!(stock_of(&ledger, b.id).await, 4.0);
        assert!(ledger.database().sales().get_by_id(sale_id).await.unwrap().is_none());

        let restocks = ledger
            .database()
            .movements()
            .by_reference(&cancellation_reference(sale_id))
            .await
            .unwrap();
        assert_eq!(restocks.len(), 2);
        assert!(restocks.iter().all(|m| m.movement_type == MovementType::In));
        assert!(restocks
            .iter()
            .all(|m| m.reference.as_deref().unwrap_or("").contains(&sale_id.to_string())));

        let err = ledger.cancel_sale(sale_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SaleNotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sales_on_last_unit() {
        let ledger = ledger().await;
        let product_id = create(&ledger, "LAST-1", 1.0).await.id;

        let first = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.record_sale(&[line(product_id, 1.0, 5.0)], None).await })
        };
        let second = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.record_sale(&[line(product_id, 1.0, 5.0)], None).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let shortages = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::InsufficientStock))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(shortages, 1);
        assert_eq!(stock_of(&ledger, product_id).await, 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sales_from_two_handles_on_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");

        let first_ledger =
            InventoryLedger::new(Database::new(DbConfig::new(path.clone())).await.unwrap());
        let second_ledger =
            InventoryLedger::new(Database::new(DbConfig::new(path.clone())).await.unwrap());
        let product_id = create(&first_ledger, "SHARED-1", 1.0).await.id;

        let first = {
            let ledger = first_ledger.clone();
            tokio::spawn(async move { ledger.record_sale(&[line(product_id, 1.0, 5.0)], None).await })
        };
        let second = {
            let ledger = second_ledger.clone();
            tokio::spawn(async move { ledger.record_sale(&[line(product_id, 1.0, 5.0)], None).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let shortages = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::InsufficientStock))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(shortages, 1);
        assert_eq!(stock_of(&second_ledger, product_id).await, 0.0);

        first_ledger.database().close().await;
        second_ledger.database().close().await;
    }

    #[tokio::test]
    async fn test_update_product_recomputes_with_markup() {
        let ledger = ledger().await;
        let product = create(&ledger, "EDIT-1", 5.0).await;

        let listing = ledger
            .update_product(
                product.id,
                ProductUpdate {
                    draft: draft("EDIT-1", 100.0),
                    margin_pct: 50.0,
                    sale_price: None,
                    stock_qty: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(listing.product.sale_price, 150.0);

        let listing = ledger
            .update_product(
                product.id,
                ProductUpdate {
                    draft: draft("EDIT-1", 100.0),
                    margin_pct: 50.0,
                    sale_price: Some(99.5),
                    stock_qty: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(listing.product.sale_price, 100.0);
        assert_eq!(listing.product.stock_qty, 5.0);
    }

    #[tokio::test]
    async fn test_update_stock_writes_one_adjustment() {
        let ledger = ledger().await;
        let product = create(&ledger, "ADJ-1", 5.0).await;

        let update = |stock_qty| ProductUpdate {
            draft: draft("ADJ-1", 100.0),
            margin_pct: 50.0,
            sale_price: None,
            stock_qty: Some(stock_qty),
        };

        ledger.update_product(product.id, update(2.0)).await.unwrap();
        assert_eq!(stock_of(&ledger, product.id).await, 2.0);

        let adjustments = ledger
            .database()
            .movements()
            .by_reference(ADJUSTMENT_REFERENCE)
            .await
            .unwrap();
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].movement_type, MovementType::Out);
        assert_eq!(adjustments[0].qty, 3.0);

        // Unchanged quantity writes nothing
        ledger.update_product(product.id, update(2.0)).await.unwrap();
        let movements = ledger.database().movements().for_product(product.id).await.unwrap();
        assert_eq!(movements.len(), 2);
    }

    #[tokio::test]
    async fn test_update_product_conflicts_and_missing() {
        let ledger = ledger().await;
        create(&ledger, "TAKEN-1", 0.0).await;
        let other = create(&ledger, "OTHER-1", 0.0).await;

        let err = ledger
            .update_product(
                other.id,
                ProductUpdate {
                    draft: draft("TAKEN-1", 10.0),
                    margin_pct: 10.0,
                    sale_price: None,
                    stock_qty: Some(7.0),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(stock_of(&ledger, other.id).await, 0.0);

        let err = ledger
            .update_product(
                9999,
                ProductUpdate {
                    draft: draft("GHOST-1", 10.0),
                    margin_pct: 10.0,
                    sale_price: None,
                    stock_qty: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductNotFound);
    }

    #[tokio::test]
    async fn test_delete_product_rules() {
        let ledger = ledger().await;
        let sold = create(&ledger, "SOLD-1", 5.0).await;
        let unsold = create(&ledger, "UNSOLD-1", 5.0).await;

        ledger
            .record_sale(&[line(sold.id, 1.0, 1.0)], None)
            .await
            .unwrap();

        let err = ledger.delete_product(sold.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(ledger.database().products().get_by_id(sold.id).await.unwrap().is_some());

        ledger.delete_product(unsold.id).await.unwrap();
        assert!(ledger.database().products().get_by_id(unsold.id).await.unwrap().is_none());
        let movements = ledger.database().movements().for_product(unsold.id).await.unwrap();
        assert!(movements.is_empty());

        let err = ledger.delete_product(unsold.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProductNotFound);
    }

    #[tokio::test]
    async fn test_reprice_all_is_idempotent() {
        let ledger = ledger().await;
        let a = create(&ledger, "REPRICE-A", 0.0).await;
        create(&ledger, "REPRICE-B", 0.0).await;

        let changed = ledger.reprice_all(50.0).await.unwrap();
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().all(|c| c.new_sale_price == 150.0));

        let repriced = ledger.database().products().get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(repriced.sale_price, 150.0);
        assert_eq!(repriced.margin_pct, 50.0);

        let second = ledger.reprice_all(50.0).await.unwrap();
        assert!(second.is_empty());

        let checks = ledger.verify_markups(50.0, 0.1).await.unwrap();
        assert!(checks.iter().all(|c| c.ok));
    }

    #[tokio::test]
    async fn test_reprice_all_skips_products_already_at_price() {
        let ledger = ledger().await;
        let p = create(&ledger, "AT-PRICE-1", 0.0).await;

        ledger
            .update_product(
                p.id,
                ProductUpdate {
                    draft: draft("AT-PRICE-1", 100.0),
                    margin_pct: 10.0,
                    sale_price: Some(150.0),
                    stock_qty: None,
                },
            )
            .await
            .unwrap();

        let changed = ledger.reprice_all(50.0).await.unwrap();
        assert!(changed.is_empty());

        let after = ledger.database().products().get_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(after.sale_price, 150.0);
        assert_eq!(after.margin_pct, 10.0);
    }

    #[tokio::test]
    async fn test_preview_repricing_writes_nothing() {
        let ledger = ledger().await;
        let a = create(&ledger, "PREVIEW-1", 0.0).await;

        let preview = ledger.preview_repricing(50.0).await.unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].current_sale_price, 200.0);
        assert_eq!(preview[0].new_sale_price, 150.0);
        assert_eq!(preview[0].difference, -50.0);

        let unchanged = ledger.database().products().get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(unchanged.sale_price, 200.0);
    }
}
