// src/services/purchase_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{CatalogStore, InventoryLedger, PurchaseStore},
    models::{
        auth::{Role, User},
        purchase::{NewPurchase, Purchase, PurchaseReceipt, SkuSummary},
    },
};

// Totals are stored as NUMERIC(14, 2)
fn max_total_price() -> Decimal {
    Decimal::from(1_000_000_000_000i64)
}

#[derive(Clone)]
pub struct PurchaseService {
    catalog: Arc<dyn CatalogStore>,
    ledger: Arc<dyn InventoryLedger>,
    purchases: Arc<dyn PurchaseStore>,
}

impl PurchaseService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        ledger: Arc<dyn InventoryLedger>,
        purchases: Arc<dyn PurchaseStore>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            purchases,
        }
    }

    /// Buys `quantity` units of a SKU for `user`.
    ///
    /// Either the stock is deducted and the purchase recorded, or nothing
    /// changes. Any role may buy.
    pub async fn purchase(
        &self,
        user: &User,
        sku_id: i64,
        quantity: i64,
    ) -> Result<PurchaseReceipt, AppError> {
        let result = self.try_purchase(user, sku_id, quantity).await;

        match &result {
            Ok(receipt) => tracing::info!(
                purchase_id = receipt.id,
                user_id = user.id,
                sku_id,
                quantity,
                total_price = %receipt.total_price,
                "purchase completed"
            ),
            Err(e) => tracing::warn!(
                user_id = user.id,
                sku_id,
                quantity,
                error = %e,
                "purchase rejected"
            ),
        }

        result
    }

    async fn try_purchase(
        &self,
        user: &User,
        sku_id: i64,
        quantity: i64,
    ) -> Result<PurchaseReceipt, AppError> {
        // 1. Validate quantity
        if quantity < 1 {
            return Err(AppError::field("quantity", "Quantity must be a positive integer."));
        }

        // 2. Resolve the SKU; inactive SKUs and SKUs of inactive items do not exist here
        let (sku, item) = self
            .catalog
            .get_active_sku(sku_id)
            .await?
            .ok_or(AppError::NotFound("SKU"))?;

        // 3. Units to take out of stock, and the price snapshot
        let units = sku
            .unit_value
            .checked_mul(quantity)
            .ok_or_else(|| AppError::field("quantity", "Quantity is too large."))?;
        let total_price = sku
            .price
            .checked_mul(Decimal::from(quantity))
            .filter(|total| *total < max_total_price())
            .ok_or_else(|| AppError::field("quantity", "Quantity is too large."))?;

        // 4. Deduct and record in one transaction
        let purchase = self
            .ledger
            .deduct_and_record(
                item.id,
                units,
                NewPurchase {
                    user_id: user.id,
                    sku_id: sku.id,
                    quantity,
                    total_price,
                },
            )
            .await?;

        // 5. Receipt
        let summary = SkuSummary::new(&sku, item.sale_type);
        Ok(PurchaseReceipt::new(purchase, summary))
    }

    /// The caller's purchases, newest first.
    pub async fn my_purchases(&self, user: &User) -> Result<Vec<Purchase>, AppError> {
        self.purchases.list_for_user(user.id).await
    }

    /// Someone else's purchase is reported as not found, unless the caller is an admin.
    pub async fn get_purchase(&self, user: &User, purchase_id: i64) -> Result<Purchase, AppError> {
        self.purchases
            .get_purchase(purchase_id)
            .await?
            .filter(|p| p.user_id == user.id || user.role == Role::Admin)
            .ok_or(AppError::NotFound("Purchase"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::inventory::{Category, Item, NewItem, NewSku, SaleType, Sku};
    use chrono::Utc;

    struct Shop {
        store: Arc<MemoryStore>,
        service: PurchaseService,
        item: Item,
        sku: Sku,
    }

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            email: format!("user{id}@example.com"),
            name: format!("User {id}"),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // Kaju Katli, 5000g in stock, one 250g SKU at 450.00
    async fn shop() -> Shop {
        let store = Arc::new(MemoryStore::new());
        let item = store
            .create_item(NewItem {
                name: "Kaju Katli".to_string(),
                category: Category::Dry,
                sale_type: SaleType::Weight,
            })
            .await
            .unwrap();
        let item = store.set_quantity(item.id, 5000).await.unwrap();
        let sku = store
            .create_sku(NewSku {
                item_id: item.id,
                code: "KK-250".to_string(),
                unit_value: 250,
                price: "450.00".parse().unwrap(),
            })
            .await
            .unwrap();
        let service = PurchaseService::new(store.clone(), store.clone(), store.clone());
        Shop {
            store,
            service,
            item,
            sku,
        }
    }

    async fn stock(shop: &Shop) -> i64 {
        shop.store.get_item(shop.item.id).await.unwrap().unwrap().inventory_qty
    }

    #[tokio::test]
    async fn purchase_deducts_units_and_snapshots_the_price() {
        let shop = shop().await;
        let buyer = user(7, Role::Customer);

        let receipt = shop.service.purchase(&buyer, shop.sku.id, 3).await.unwrap();
        assert_eq!(receipt.total_price.to_string(), "1350.00");
        assert_eq!(receipt.quantity, 3);
        assert_eq!(receipt.user, buyer.id);
        assert_eq!(receipt.sku.display_unit, "250g");
        assert_eq!(stock(&shop).await, 4250);
    }

    #[tokio::test]
    async fn empty_and_short_stock_fail_differently_without_side_effects() {
        let shop = shop().await;
        let buyer = user(7, Role::Cashier);

        let short = shop.service.purchase(&buyer, shop.sku.id, 40).await;
        assert!(matches!(
            short,
            Err(AppError::InsufficientStock { requested: 10_000, available: 5000 })
        ));
        assert_eq!(stock(&shop).await, 5000);

        shop.store.set_quantity(shop.item.id, 0).await.unwrap();
        let empty = shop.service.purchase(&buyer, shop.sku.id, 1).await;
        assert!(matches!(empty, Err(AppError::OutOfStock)));
        assert!(shop.service.my_purchases(&buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_quantities_are_field_errors() {
        let shop = shop().await;
        let buyer = user(7, Role::Customer);

        assert!(matches!(
            shop.service.purchase(&buyer, shop.sku.id, 0).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            shop.service.purchase(&buyer, shop.sku.id, i64::MAX).await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(stock(&shop).await, 5000);
    }

    #[tokio::test]
    async fn inactive_skus_and_items_are_not_found() {
        let shop = shop().await;
        let buyer = user(7, Role::Admin);

        assert!(matches!(shop.service.purchase(&buyer, 999, 1).await, Err(AppError::NotFound(_))));

        shop.store.set_item_active(shop.item.id, false).await.unwrap();
        assert!(matches!(
            shop.service.purchase(&buyer, shop.sku.id, 1).await,
            Err(AppError::NotFound(_))
        ));

        shop.store.set_item_active(shop.item.id, true).await.unwrap();
        shop.store.set_sku_active(shop.sku.id, false).await.unwrap();
        assert!(matches!(
            shop.service.purchase(&buyer, shop.sku.id, 1).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(stock(&shop).await, 5000);
    }

    #[tokio::test]
    async fn record_failure_leaves_stock_untouched() {
        let shop = shop().await;
        let buyer = user(7, Role::Customer);

        shop.store.fail_next_append();
        assert!(shop.service.purchase(&buyer, shop.sku.id, 2).await.is_err());
        assert_eq!(stock(&shop).await, 5000);
        assert!(shop.service.my_purchases(&buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn later_price_changes_do_not_touch_old_purchases() {
        let shop = shop().await;
        let buyer = user(7, Role::Customer);

        let receipt = shop.service.purchase(&buyer, shop.sku.id, 1).await.unwrap();

        // Repricing is modelled as retiring the SKU and adding a new one
        shop.store.set_sku_active(shop.sku.id, false).await.unwrap();
        shop.store
            .create_sku(NewSku {
                item_id: shop.item.id,
                code: "KK-250-B".to_string(),
                unit_value: 250,
                price: "500.00".parse().unwrap(),
            })
            .await
            .unwrap();

        let stored = shop.service.get_purchase(&buyer, receipt.id).await.unwrap();
        assert_eq!(stored.total_price.to_string(), "450.00");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_buyers_never_oversell() {
        let shop = shop().await;
        let service = shop.service.clone();
        let sku_id = shop.sku.id;

        let mut handles = Vec::new();
        for i in 0..50 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.purchase(&user(100 + i, Role::Customer), sku_id, 1).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 20);
        assert_eq!(stock(&shop).await, 0);
    }

    #[tokio::test]
    async fn purchases_are_private_to_their_owner_and_admins() {
        let shop = shop().await;
        let owner = user(7, Role::Customer);
        let other = user(8, Role::Cashier);
        let admin = user(1, Role::Admin);

        let receipt = shop.service.purchase(&owner, shop.sku.id, 1).await.unwrap();

        assert!(shop.service.get_purchase(&owner, receipt.id).await.is_ok());
        assert!(shop.service.get_purchase(&admin, receipt.id).await.is_ok());
        assert!(matches!(
            shop.service.get_purchase(&other, receipt.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
