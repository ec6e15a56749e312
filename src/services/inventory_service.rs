// src/services/inventory_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::InventoryLedger,
    models::inventory::ItemView,
};

#[derive(Clone)]
pub struct InventoryService {
    ledger: Arc<dyn InventoryLedger>,
}

impl InventoryService {
    pub fn new(ledger: Arc<dyn InventoryLedger>) -> Self {
        Self { ledger }
    }

    /// Overwrites the stock level (grams or pieces, per the item's sale type).
    /// Not a delta: repeating the call leaves the same quantity.
    pub async fn set_inventory(&self, item_id: i64, quantity: i64) -> Result<ItemView, AppError> {
        if quantity < 0 {
            return Err(AppError::field("quantity", "Quantity cannot be negative."));
        }

        let item = self.ledger.set_quantity(item_id, quantity).await?;

        tracing::info!(item_id, quantity, "inventory set");
        Ok(item.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogStore, MemoryStore};
    use crate::models::inventory::{Category, InventoryUnit, NewItem, SaleType};

    #[tokio::test]
    async fn set_inventory_overwrites_and_reports_the_unit() {
        let store = Arc::new(MemoryStore::new());
        let item = store
            .create_item(NewItem {
                name: "Gulab Jamun".to_string(),
                category: Category::Milk,
                sale_type: SaleType::Count,
            })
            .await
            .unwrap();
        let service = InventoryService::new(store.clone());

        let view = service.set_inventory(item.id, 40).await.unwrap();
        assert_eq!(view.item.inventory_qty, 40);
        assert_eq!(view.inventory_unit, InventoryUnit::Pieces);

        let view = service.set_inventory(item.id, 12).await.unwrap();
        assert_eq!(view.item.inventory_qty, 12);
    }

    #[tokio::test]
    async fn negative_and_unknown_are_rejected() {
        let service = InventoryService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(service.set_inventory(1, -5).await, Err(AppError::ValidationError(_))));
        assert!(matches!(service.set_inventory(1, 5).await, Err(AppError::NotFound(_))));
    }
}
