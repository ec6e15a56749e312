// src/services/catalog_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::CatalogStore,
    models::inventory::{
        CreateItemPayload, CreateSkuPayload, ItemDetail, ItemView, NewItem, NewSku, SkuView,
    },
};

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    // --- Items ---

    pub async fn create_item(&self, payload: CreateItemPayload) -> Result<ItemView, AppError> {
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(AppError::field("name", "Name is required."));
        }

        let item = self
            .catalog
            .create_item(NewItem {
                name: name.to_string(),
                category: payload.category,
                sale_type: payload.sale_type,
            })
            .await?;

        tracing::info!(item_id = item.id, name = %item.name, "item created");
        Ok(item.into())
    }

    pub async fn list_active_items(&self) -> Result<Vec<ItemView>, AppError> {
        let items = self.catalog.list_active_items().await?;
        Ok(items.into_iter().map(ItemView::from).collect())
    }

    /// Inactive items are indistinguishable from unknown ones.
    pub async fn item_detail(&self, item_id: i64) -> Result<ItemDetail, AppError> {
        let item = self
            .catalog
            .get_item(item_id)
            .await?
            .filter(|item| item.is_active)
            .ok_or(AppError::NotFound("Item"))?;

        let sale_type = item.sale_type;
        let skus = self
            .catalog
            .list_active_skus(item.id)
            .await?
            .into_iter()
            .map(|sku| SkuView::new(sku, sale_type))
            .collect();

        Ok(ItemDetail {
            item: item.into(),
            skus,
        })
    }

    /// Soft delete. Repeating it is a no-op.
    pub async fn deactivate_item(&self, item_id: i64) -> Result<ItemView, AppError> {
        let item = self.catalog.set_item_active(item_id, false).await?;
        tracing::info!(item_id, "item deactivated");
        Ok(item.into())
    }

    // --- SKUs ---

    pub async fn create_sku(&self, payload: CreateSkuPayload) -> Result<SkuView, AppError> {
        // Any item, active or not, can receive SKUs
        let item = self
            .catalog
            .get_item(payload.item)
            .await?
            .ok_or_else(|| AppError::field("item", "Item not found."))?;

        let code = payload.code.trim();
        if code.is_empty() {
            return Err(AppError::field("code", "SKU code is required."));
        }

        // Stored with exactly two fractional digits
        let mut price = payload.price;
        price.rescale(2);

        let sku = self
            .catalog
            .create_sku(NewSku {
                item_id: item.id,
                code: code.to_string(),
                unit_value: payload.unit_value,
                price,
            })
            .await?;

        tracing::info!(sku_id = sku.id, item_id = item.id, code = %sku.code, "sku created");
        Ok(SkuView::new(sku, item.sale_type))
    }

    pub async fn deactivate_sku(&self, sku_id: i64) -> Result<SkuView, AppError> {
        let sku = self.catalog.set_sku_active(sku_id, false).await?;
        let item = self
            .catalog
            .get_item(sku.item_id)
            .await?
            .ok_or(AppError::NotFound("Item"))?;

        tracing::info!(sku_id, "sku deactivated");
        Ok(SkuView::new(sku, item.sale_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::inventory::{Category, SaleType};

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::new()))
    }

    fn item_payload(name: &str, sale_type: SaleType) -> CreateItemPayload {
        CreateItemPayload {
            name: name.to_string(),
            category: Category::Dry,
            sale_type,
        }
    }

    fn sku_payload(item: i64, code: &str, unit_value: i64, price: &str) -> CreateSkuPayload {
        CreateSkuPayload {
            item,
            code: code.to_string(),
            unit_value,
            price: price.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn new_items_start_empty_and_active() {
        let catalog = service();
        let view = catalog
            .create_item(item_payload("  Kaju Katli  ", SaleType::Weight))
            .await
            .unwrap();
        assert_eq!(view.item.name, "Kaju Katli");
        assert_eq!(view.item.inventory_qty, 0);
        assert!(view.item.is_active);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let catalog = service();
        let result = catalog.create_item(item_payload("   ", SaleType::Weight)).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn sku_prices_are_stored_with_two_decimals() {
        let catalog = service();
        let item = catalog.create_item(item_payload("Rasgulla", SaleType::Count)).await.unwrap();

        let sku = catalog.create_sku(sku_payload(item.item.id, "RG-6", 6, "120.5")).await.unwrap();
        assert_eq!(sku.sku.price.to_string(), "120.50");
        assert_eq!(sku.display_unit, "6pcs");
    }

    #[tokio::test]
    async fn sku_for_unknown_item_is_a_field_error() {
        let catalog = service();
        let result = catalog.create_sku(sku_payload(42, "X-1", 1, "1.00")).await;
        let Err(AppError::ValidationError(errors)) = result else {
            panic!("expected a validation error");
        };
        assert!(errors.field_errors().contains_key("item"));
    }

    #[tokio::test]
    async fn detail_lists_only_active_skus_and_hides_inactive_items() {
        let catalog = service();
        let item = catalog.create_item(item_payload("Kaju Katli", SaleType::Weight)).await.unwrap();
        let item_id = item.item.id;

        let small = catalog
            .create_sku(sku_payload(item_id, "KK-250", 250, "450.00"))
            .await
            .unwrap();
        catalog.create_sku(sku_payload(item_id, "KK-1000", 1000, "1700.00")).await.unwrap();
        catalog.deactivate_sku(small.sku.id).await.unwrap();

        let detail = catalog.item_detail(item_id).await.unwrap();
        let codes: Vec<&str> = detail.skus.iter().map(|s| s.sku.code.as_str()).collect();
        assert_eq!(codes, vec!["KK-1000"]);
        assert_eq!(detail.skus[0].display_unit, "1.0kg");

        catalog.deactivate_item(item_id).await.unwrap();
        assert!(matches!(catalog.item_detail(item_id).await, Err(AppError::NotFound(_))));
        assert!(catalog.list_active_items().await.unwrap().is_empty());

        // Deactivating twice is harmless
        catalog.deactivate_item(item_id).await.unwrap();
    }

    #[tokio::test]
    async fn listing_is_ordered_by_name() {
        let catalog = service();
        catalog.create_item(item_payload("Rasgulla", SaleType::Count)).await.unwrap();
        catalog.create_item(item_payload("Barfi", SaleType::Weight)).await.unwrap();

        let names: Vec<String> = catalog
            .list_active_items()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.item.name)
            .collect();
        assert_eq!(names, vec!["Barfi", "Rasgulla"]);
    }
}
