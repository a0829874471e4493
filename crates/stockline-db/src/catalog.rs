//! # Catalog Service
//!
//! Writes for categories and suppliers. Like the ledger, every write runs in
//! a unit of work so it waits its turn behind open stock transactions.

use chrono::Utc;
use tracing::info;

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::pool::Database;
use crate::repository::supplier::SupplierFields;
use crate::repository::{category, supplier};
use stockline_core::validation::{validate_email, validate_id, validate_name, validate_optional_text};
use stockline_core::{Category, CoreError, Supplier};

const MAX_NAME_LEN: usize = 100;
const MAX_CONTACT_LEN: usize = 200;

/// Category and supplier maintenance.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

fn category_conflict(err: DbError, name: &str) -> LedgerError {
    match err {
        DbError::UniqueViolation { field, .. } => CoreError::DuplicateKey {
            field,
            value: name.to_string(),
        }
        .into(),
        other => other.into(),
    }
}

fn category_not_found(id: i64) -> LedgerError {
    CoreError::NotFound {
        entity: "Category",
        id,
    }
    .into()
}

fn supplier_not_found(id: i64) -> LedgerError {
    CoreError::NotFound {
        entity: "Supplier",
        id,
    }
    .into()
}

/// Trims every field, drops empty optionals and validates the result.
fn normalize_supplier(fields: SupplierFields) -> LedgerResult<SupplierFields> {
    let optional = |text: Option<String>| {
        text.map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    };

    let fields = SupplierFields {
        name: fields.name.trim().to_string(),
        contact: optional(fields.contact),
        email: optional(fields.email),
        phone: optional(fields.phone),
        address: optional(fields.address),
    };

    validate_name("name", &fields.name, MAX_NAME_LEN)?;
    validate_optional_text("contact", fields.contact.as_deref(), MAX_CONTACT_LEN)?;
    validate_email(fields.email.as_deref())?;
    validate_optional_text("phone", fields.phone.as_deref(), 50)?;
    validate_optional_text("address", fields.address.as_deref(), MAX_CONTACT_LEN)?;

    Ok(fields)
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Creates a category.
    ///
    /// ## Errors
    /// - `InvalidInput` for an empty or overlong name
    /// - `DuplicateKey` when the name is taken
    pub async fn create_category(&self, name: &str) -> LedgerResult<Category> {
        let name = name.trim();
        validate_name("name", name, MAX_NAME_LEN)?;

        let mut uow = self.db.begin().await?;
        let id = category::insert(uow.conn(), name, Utc::now())
            .await
            .map_err(|e| category_conflict(e, name))?;
        let created = category::find_by_id(uow.conn(), id)
            .await?
            .ok_or_else(|| category_not_found(id))?;
        uow.commit().await?;

        info!(category_id = id, name = %name, "Category created");
        Ok(created)
    }

    /// Renames a category.
    pub async fn rename_category(&self, id: i64, name: &str) -> LedgerResult<Category> {
        validate_id("id", id)?;
        let name = name.trim();
        validate_name("name", name, MAX_NAME_LEN)?;

        let mut uow = self.db.begin().await?;
        let renamed = category::rename(uow.conn(), id, name)
            .await
            .map_err(|e| category_conflict(e, name))?;
        if !renamed {
            return Err(category_not_found(id));
        }
        let updated = category::find_by_id(uow.conn(), id)
            .await?
            .ok_or_else(|| category_not_found(id))?;
        uow.commit().await?;

        info!(category_id = id, name = %name, "Category renamed");
        Ok(updated)
    }

    /// Deletes a category no product is filed under.
    ///
    /// ## Errors
    /// - `NotFound` if the category does not exist
    /// - `InvalidInput` if products still use it
    pub async fn delete_category(&self, id: i64) -> LedgerResult<()> {
        validate_id("id", id)?;

        let mut uow = self.db.begin().await?;
        let current = category::find_by_id(uow.conn(), id)
            .await?
            .ok_or_else(|| category_not_found(id))?;

        if current.product_count > 0 {
            return Err(CoreError::invalid(format!(
                "category '{}' has {} products and cannot be deleted",
                current.name, current.product_count
            ))
            .into());
        }

        category::delete(uow.conn(), id).await?;
        uow.commit().await?;

        info!(category_id = id, "Category deleted");
        Ok(())
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    /// Creates a supplier.
    pub async fn create_supplier(&self, fields: SupplierFields) -> LedgerResult<Supplier> {
        let fields = normalize_supplier(fields)?;

        let mut uow = self.db.begin().await?;
        let id = supplier::insert(uow.conn(), &fields, Utc::now()).await?;
        let created = supplier::find_by_id(uow.conn(), id)
            .await?
            .ok_or_else(|| supplier_not_found(id))?;
        uow.commit().await?;

        info!(supplier_id = id, name = %fields.name, "Supplier created");
        Ok(created)
    }

    /// Overwrites a supplier's details.
    pub async fn update_supplier(&self, id: i64, fields: SupplierFields) -> LedgerResult<Supplier> {
        validate_id("id", id)?;
        let fields = normalize_supplier(fields)?;

        let mut uow = self.db.begin().await?;
        if !supplier::update(uow.conn(), id, &fields).await? {
            return Err(supplier_not_found(id));
        }
        let updated = supplier::find_by_id(uow.conn(), id)
            .await?
            .ok_or_else(|| supplier_not_found(id))?;
        uow.commit().await?;

        info!(supplier_id = id, "Supplier updated");
        Ok(updated)
    }

    /// Deletes a supplier no product is bought from.
    pub async fn delete_supplier(&self, id: i64) -> LedgerResult<()> {
        validate_id("id", id)?;

        let mut uow = self.db.begin().await?;
        let current = supplier::find_by_id(uow.conn(), id)
            .await?
            .ok_or_else(|| supplier_not_found(id))?;

        if current.product_count > 0 {
            return Err(CoreError::invalid(format!(
                "supplier '{}' has {} products and cannot be deleted",
                current.name, current.product_count
            ))
            .into());
        }

        supplier::delete(uow.conn(), id).await?;
        uow.commit().await?;

        info!(supplier_id = id, "Supplier deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InventoryLedger, NewProduct, ProductDraft};
    use crate::DbConfig;
    use stockline_core::pricing::CreationTarget;
    use stockline_core::{ErrorKind, PricingMode};

    async fn catalog() -> Catalog {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Catalog::new(db)
    }

    #[tokio::test]
    async fn test_category_lifecycle() {
        let catalog = catalog().await;

        let drinks = catalog.create_category("  Drinks ").await.unwrap();
        assert_eq!(drinks.name, "Drinks");
        assert_eq!(drinks.product_count, 0);

        let renamed = catalog.rename_category(drinks.id, "Beverages").await.unwrap();
        assert_eq!(renamed.name, "Beverages");

        catalog.delete_category(drinks.id).await.unwrap();
        let err = catalog.delete_category(drinks.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_category_name_is_unique() {
        let catalog = catalog().await;
        catalog.create_category("Dairy").await.unwrap();
        let bakery = catalog.create_category("Bakery").await.unwrap();

        let err = catalog.create_category("Dairy").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);

        let err = catalog.rename_category(bakery.id, "Dairy").await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::DuplicateKey { ref value, .. }) if value == "Dairy"
        ));

        let err = catalog.create_category("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = Catalog::new(db.clone());
        let ledger = InventoryLedger::new(db.clone());

        let grains = catalog.create_category("Grains").await.unwrap();
        let supplier = catalog
            .create_supplier(SupplierFields {
                name: "Mill Co".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        ledger
            .create_product(NewProduct {
                draft: ProductDraft {
                    sku: "OATS-1KG".to_string(),
                    barcode: None,
                    name: "Oats".to_string(),
                    description: None,
                    category_id: Some(grains.id),
                    supplier_id: Some(supplier.id),
                    purchase_price: 10.0,
                    pricing_mode: PricingMode::Unit,
                    package_weight_kg: None,
                    stock_min: 0.0,
                },
                target: CreationTarget::Margin(20.0),
                initial_qty: 0.0,
            })
            .await
            .unwrap();

        let err = catalog.delete_category(grains.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = catalog.delete_supplier(supplier.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let listed = db.categories().list().await.unwrap();
        assert_eq!(listed[0].product_count, 1);
    }

    #[tokio::test]
    async fn test_supplier_lifecycle() {
        let catalog = catalog().await;

        let created = catalog
            .create_supplier(SupplierFields {
                name: "Acme".to_string(),
                email: Some("orders@acme.test".to_string()),
                phone: Some("  ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.email.as_deref(), Some("orders@acme.test"));
        assert_eq!(created.phone, None);

        let updated = catalog
            .update_supplier(
                created.id,
                SupplierFields {
                    name: "Acme Ltd".to_string(),
                    contact: Some("Jo".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Acme Ltd");
        assert_eq!(updated.email, None);

        let err = catalog
            .update_supplier(
                created.id,
                SupplierFields {
                    name: "Acme".to_string(),
                    email: Some("not-an-email".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        catalog.delete_supplier(created.id).await.unwrap();
        let err = catalog
            .update_supplier(
                created.id,
                SupplierFields {
                    name: "Gone".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
