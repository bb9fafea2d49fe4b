use derive_new::new;
use ulid::Ulid;

use domain::identity::{Identity, Role, STAFF};
use domain::products::{self, StockOperation};
use domain::Error;

use crate::cqrs::{self, ProductCqrs, ProductViews};

/// Catalog and stock operations. Every stock movement goes through the
/// product aggregate, so the event stream is the audit trail.
#[derive(new)]
pub struct InventoryLedger {
    products: ProductCqrs,
    views: ProductViews,
}

impl InventoryLedger {
    /// Register a product with its opening stock level. Admin only.
    pub async fn create_product(
        &self,
        identity: &Identity,
        name: &str,
        price_cents: u64,
        stock_quantity: u32,
        prescription_required: bool,
    ) -> Result<products::View, Error> {
        identity.require_role(&[Role::Admin], "create products")?;

        let product_id = Ulid::new().to_string();
        let command = products::Command::Create {
            id: product_id.clone(),
            name: name.to_string(),
            price_cents,
            stock_quantity,
            prescription_required,
        };
        cqrs::execute(&self.products, &product_id, command).await?;
        tracing::info!(product_id, name, "product registered");

        cqrs::require_view(&self.views, &product_id).await
    }

    /// Apply a stock delta. A SUBTRACT below zero is rejected and leaves the
    /// level untouched.
    pub async fn adjust_stock(
        &self,
        identity: &Identity,
        product_id: &str,
        quantity: u32,
        operation: StockOperation,
    ) -> Result<products::View, Error> {
        identity.require_role(STAFF, "adjust stock")?;

        let command = products::Command::AdjustStock {
            quantity,
            operation,
        };
        cqrs::execute(&self.products, product_id, command).await?;
        tracing::info!(product_id, ?operation, quantity, "stock adjusted");

        cqrs::require_view(&self.views, product_id).await
    }

    pub async fn get(&self, product_id: &str) -> Result<products::View, Error> {
        cqrs::require_view(&self.views, product_id).await
    }

    pub async fn all(&self) -> Vec<products::View> {
        self.views.select(|_| true).await
    }

    /// Products at or below the threshold, computed from current levels.
    pub async fn low_stock(&self, threshold: u32) -> Vec<products::View> {
        self.views
            .select(|view| view.product.stock_quantity <= threshold)
            .await
    }
}
