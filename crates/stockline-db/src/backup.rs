//! # Product Backup
//!
//! Point-in-time export of the product catalog, taken before batch
//! re-pricing or any other bulk edit.
//!
//! ## Output
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  backup-products-<timestamp>.json                                       │
//! │    { timestamp, totalProducts, products: [Product + categoryName,      │
//! │                                           supplierName] }              │
//! │                                                                         │
//! │  backup-products-<timestamp>.csv                                        │
//! │    ID,SKU,Barcode,Name,Description,Category,PurchasePrice,MarginPct,   │
//! │    SalePrice,PricingMode,PackageWeightKg,StockQty,StockMin,Supplier,   │
//! │    CreatedAt,UpdatedAt                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `<timestamp>` is the snapshot time in UTC with `:` and `.` replaced by
//! `-`, so file names sort chronologically.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use stockline_core::{PricingMode, ProductListing};
use thiserror::Error;
use tracing::info;

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::product::ProductFilter;

/// Failures while taking or writing a backup.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Writing backup failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type BackupResult<T> = Result<T, BackupError>;

/// Every product with its category and supplier names, as of `timestamp`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBackup {
    pub timestamp: DateTime<Utc>,
    pub total_products: usize,
    pub products: Vec<ProductListing>,
}

/// Paths of the two files written by [`ProductBackup::write_to`].
#[derive(Debug, Clone, PartialEq)]
pub struct BackupFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// One CSV line. Absent text is written as an empty cell.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CsvRow<'a> {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "SKU")]
    sku: &'a str,
    barcode: &'a str,
    name: &'a str,
    description: &'a str,
    category: &'a str,
    purchase_price: f64,
    margin_pct: f64,
    sale_price: f64,
    pricing_mode: PricingMode,
    package_weight_kg: f64,
    stock_qty: f64,
    stock_min: f64,
    supplier: &'a str,
    created_at: String,
    updated_at: String,
}

impl<'a> From<&'a ProductListing> for CsvRow<'a> {
    fn from(listing: &'a ProductListing) -> Self {
        let p = &listing.product;
        CsvRow {
            id: p.id,
            sku: &p.sku,
            barcode: p.barcode.as_deref().unwrap_or_default(),
            name: &p.name,
            description: p.description.as_deref().unwrap_or_default(),
            category: listing.category_name.as_deref().unwrap_or_default(),
            purchase_price: p.purchase_price,
            margin_pct: p.margin_pct,
            sale_price: p.sale_price,
            pricing_mode: p.pricing_mode,
            package_weight_kg: p.package_weight_kg,
            stock_qty: p.stock_qty,
            stock_min: p.stock_min,
            supplier: listing.supplier_name.as_deref().unwrap_or_default(),
            created_at: p.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            updated_at: p.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl ProductBackup {
    /// Reads every product, unfiltered, in listing order.
    pub async fn take(db: &Database) -> BackupResult<Self> {
        let products = db.products().list(&ProductFilter::default()).await?;
        Ok(ProductBackup {
            timestamp: Utc::now(),
            total_products: products.len(),
            products,
        })
    }

    /// File name without extension, e.g. `backup-products-2026-10-18T09-30-00-000Z`.
    pub fn file_stem(&self) -> String {
        format!(
            "backup-products-{}",
            self.timestamp.format("%Y-%m-%dT%H-%M-%S-%3fZ")
        )
    }

    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> BackupResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// CSV with a header line, one row per product.
    pub fn to_csv(&self) -> BackupResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for listing in &self.products {
            writer.serialize(CsvRow::from(listing))?;
        }
        if self.products.is_empty() {
            writer.write_record(CSV_HEADER)?;
        }
        writer
            .into_inner()
            .map_err(|e| BackupError::Io(e.into_error()))
    }

    /// Writes the JSON and CSV files into `dir`, which must exist.
    pub fn write_to(&self, dir: &Path) -> BackupResult<BackupFiles> {
        let stem = self.file_stem();
        let files = BackupFiles {
            json: dir.join(format!("{stem}.json")),
            csv: dir.join(format!("{stem}.csv")),
        };

        std::fs::write(&files.json, self.to_json()?)?;
        std::fs::write(&files.csv, self.to_csv()?)?;

        info!(
            products = self.total_products,
            json = %files.json.display(),
            csv = %files.csv.display(),
            "Product backup written"
        );
        Ok(files)
    }
}

/// Header written on its own when there are no rows to derive it from.
const CSV_HEADER: [&str; 16] = [
    "ID",
    "SKU",
    "Barcode",
    "Name",
    "Description",
    "Category",
    "PurchasePrice",
    "MarginPct",
    "SalePrice",
    "PricingMode",
    "PackageWeightKg",
    "StockQty",
    "StockMin",
    "Supplier",
    "CreatedAt",
    "UpdatedAt",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InventoryLedger, NewProduct, ProductDraft};
    use crate::DbConfig;
    use stockline_core::pricing::CreationTarget;

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let category = crate::Catalog::new(db.clone())
            .create_category("Grains, dry")
            .await
            .unwrap();

        let ledger = InventoryLedger::new(db.clone());
        ledger
            .create_product(NewProduct {
                draft: ProductDraft {
                    sku: "RICE-1KG".to_string(),
                    barcode: Some("7790001".to_string()),
                    name: "Rice \"long grain\"".to_string(),
                    description: None,
                    category_id: Some(category.id),
                    supplier_id: None,
                    purchase_price: 100.0,
                    pricing_mode: PricingMode::Unit,
                    package_weight_kg: None,
                    stock_min: 2.0,
                },
                target: CreationTarget::Margin(50.0),
                initial_qty: 8.0,
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_take_includes_every_product_with_names() {
        let db = seeded().await;
        let backup = ProductBackup::take(&db).await.unwrap();

        assert_eq!(backup.total_products, 1);
        let json: serde_json::Value = serde_json::from_str(&backup.to_json().unwrap()).unwrap();
        assert_eq!(json["totalProducts"], 1);
        assert_eq!(json["products"][0]["sku"], "RICE-1KG");
        assert_eq!(json["products"][0]["salePrice"], 200.0);
        assert_eq!(json["products"][0]["stockQty"], 8.0);
        assert_eq!(json["products"][0]["categoryName"], "Grains, dry");
        assert!(json["products"][0]["supplierName"].is_null());
    }

    #[tokio::test]
    async fn test_csv_quotes_text_and_blanks_missing_names() {
        let db = seeded().await;
        let backup = ProductBackup::take(&db).await.unwrap();
        let csv = String::from_utf8(backup.to_csv().unwrap()).unwrap();

        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER.join(",").as_str()));

        let row = lines.next().unwrap();
        assert!(row.starts_with("1,RICE-1KG,7790001,\"Rice \"\"long grain\"\"\",,\"Grains, dry\",100.0,50.0,200.0,UNIT,1.0,8.0,2.0,,"));
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn test_empty_catalog_still_has_header() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let backup = ProductBackup::take(&db).await.unwrap();

        assert_eq!(backup.total_products, 0);
        let csv = String::from_utf8(backup.to_csv().unwrap()).unwrap();
        assert_eq!(csv.trim_end(), CSV_HEADER.join(","));
    }

    #[tokio::test]
    async fn test_write_to_creates_both_files() {
        let db = seeded().await;
        let backup = ProductBackup::take(&db).await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let files = backup.write_to(dir.path()).unwrap();

        assert!(files.json.ends_with(format!("{}.json", backup.file_stem())));
        assert!(!backup.file_stem().contains(':'));
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        assert_eq!(written["products"].as_array().unwrap().len(), 1);
        assert_eq!(std::fs::read_to_string(&files.csv).unwrap().lines().count(), 2);
    }
}
