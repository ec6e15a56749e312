// src/db/inventory_repo.rs
//
// Postgres implementation of the inventory ledger. The per-item lock is the
// row lock taken by `SELECT ... FOR UPDATE`, held until commit or rollback.

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::{purchase_repo::PurchaseRepository, store::InventoryLedger},
    models::{
        inventory::{check_deduct, Item},
        purchase::{NewPurchase, Purchase},
    },
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
    purchases: PurchaseRepository,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        let purchases = PurchaseRepository::new(pool.clone());
        Self { pool, purchases }
    }

    /// Reads the quantity of an active item and locks its row.
    /// Must run inside a transaction (`&mut *tx`).
    async fn lock_quantity<'e, E>(
        &self,
        executor: E,
        item_id: i64,
    ) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let qty = sqlx::query_scalar::<_, i64>(
            "SELECT inventory_qty FROM items WHERE id = $1 AND is_active = TRUE FOR UPDATE",
        )
        .bind(item_id)
        .fetch_optional(executor)
        .await?;
        Ok(qty)
    }

    async fn write_quantity<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        quantity: i64,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE items SET inventory_qty = $2, updated_at = now() WHERE id = $1")
            .bind(item_id)
            .bind(quantity)
            .execute(executor)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryLedger for InventoryRepository {
    async fn try_deduct(&self, item_id: i64, amount: i64) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .lock_quantity(&mut *tx, item_id)
            .await?
            .ok_or(AppError::NotFound("Item"))?;
        let remaining = check_deduct(current, amount)?;
        self.write_quantity(&mut *tx, item_id, remaining).await?;

        tx.commit().await?;
        Ok(remaining)
    }

    async fn set_quantity(&self, item_id: i64, quantity: i64) -> Result<Item, AppError> {
        if quantity < 0 {
            return Err(AppError::InvalidQuantity);
        }

        // A plain UPDATE takes the same row lock as a deduction, so an
        // overwrite never interleaves with an in-flight check-and-deduct.
        sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET inventory_qty = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Item"))
    }

    async fn deduct_and_record(
        &self,
        item_id: i64,
        amount: i64,
        purchase: NewPurchase,
    ) -> Result<Purchase, AppError> {
        // 1. Start the transaction. Dropping it without commit rolls back,
        //    so every `?` below leaves stock and the purchase log untouched.
        let mut tx = self.pool.begin().await?;

        // 2. Lock the item row and check stock
        let current = self
            .lock_quantity(&mut *tx, item_id)
            .await?
            .ok_or(AppError::NotFound("Item"))?;
        let remaining = check_deduct(current, amount)?;

        // 3. Deduct
        self.write_quantity(&mut *tx, item_id, remaining).await?;

        // 4. Append the purchase record
        let recorded = self.purchases.insert_purchase(&mut *tx, &purchase).await?;

        // 5. Commit
        tx.commit().await?;

        tracing::debug!(
            item_id,
            amount,
            remaining,
            purchase_id = recorded.id,
            "inventory deducted"
        );

        Ok(recorded)
    }
}

// These run against a real Postgres: `DATABASE_URL=... cargo test -- --ignored`.
// `sqlx::test` creates a scratch database per test and applies ./migrations.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            catalog_repo::CatalogRepository,
            store::{CatalogStore, PurchaseStore, UserStore},
            user_repo::UserRepository,
        },
        models::{
            auth::{NewUser, Role},
            inventory::{Category, NewItem, NewSku, SaleType, Sku},
        },
    };
    use rust_decimal::Decimal;

    struct Fixture {
        ledger: InventoryRepository,
        catalog: CatalogRepository,
        purchases: PurchaseRepository,
        item: Item,
        sku: Sku,
        buyers: Vec<i64>,
    }

    // Kaju Katli with one 250g SKU at 450.00, and two customers
    async fn fixture(pool: PgPool, stock: i64) -> Fixture {
        let users = UserRepository::new(pool.clone());
        let mut buyers = Vec::new();
        for n in 0..2 {
            let user = users
                .create_user(NewUser {
                    email: format!("buyer{n}@example.com"),
                    name: format!("Buyer {n}"),
                    password_hash: "x".to_string(),
                    role: Role::Customer,
                })
                .await
                .unwrap();
            buyers.push(user.id);
        }

        let catalog = CatalogRepository::new(pool.clone());
        let item = catalog
            .create_item(NewItem {
                name: "Kaju Katli".to_string(),
                category: Category::Dry,
                sale_type: SaleType::Weight,
            })
            .await
            .unwrap();
        let sku = catalog
            .create_sku(NewSku {
                item_id: item.id,
                code: "KK-250".to_string(),
                unit_value: 250,
                price: Decimal::new(45000, 2),
            })
            .await
            .unwrap();

        let ledger = InventoryRepository::new(pool.clone());
        let item = ledger.set_quantity(item.id, stock).await.unwrap();

        Fixture {
            ledger,
            catalog,
            purchases: PurchaseRepository::new(pool),
            item,
            sku,
            buyers,
        }
    }

    fn one_unit(user_id: i64, sku: &Sku) -> NewPurchase {
        NewPurchase {
            user_id,
            sku_id: sku.id,
            quantity: 1,
            total_price: sku.price,
        }
    }

    async fn stock(f: &Fixture) -> i64 {
        f.catalog.get_item(f.item.id).await.unwrap().unwrap().inventory_qty
    }

    async fn recorded(f: &Fixture) -> usize {
        let mut total = 0;
        for buyer in &f.buyers {
            total += f.purchases.list_for_user(*buyer).await.unwrap().len();
        }
        total
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn two_buyers_racing_for_the_last_unit(pool: PgPool) {
        let f = fixture(pool, 250).await;

        let mut handles = Vec::new();
        for buyer in f.buyers.clone() {
            let ledger = f.ledger.clone();
            let purchase = one_unit(buyer, &f.sku);
            let item_id = f.item.id;
            handles.push(tokio::spawn(async move {
                ledger.deduct_and_record(item_id, 250, purchase).await
            }));
        }

        let mut succeeded = 0;
        let mut out_of_stock = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AppError::OutOfStock) => out_of_stock += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(out_of_stock, 1);
        assert_eq!(stock(&f).await, 0);
        assert_eq!(recorded(&f).await, 1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn empty_and_short_stock_stay_distinct(pool: PgPool) {
        let f = fixture(pool, 200).await;
        let buyer = f.buyers[0];

        let short = f.ledger.deduct_and_record(f.item.id, 250, one_unit(buyer, &f.sku)).await;
        assert!(matches!(
            short,
            Err(AppError::InsufficientStock { requested: 250, available: 200 })
        ));
        assert_eq!(stock(&f).await, 200);

        f.ledger.set_quantity(f.item.id, 0).await.unwrap();
        let empty = f.ledger.deduct_and_record(f.item.id, 250, one_unit(buyer, &f.sku)).await;
        assert!(matches!(empty, Err(AppError::OutOfStock)));
        assert_eq!(recorded(&f).await, 0);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn deactivated_item_is_not_found_under_lock(pool: PgPool) {
        let f = fixture(pool, 5000).await;

        // The SKU was resolved while the item was active
        assert!(f.catalog.get_active_sku(f.sku.id).await.unwrap().is_some());
        f.catalog.set_item_active(f.item.id, false).await.unwrap();
        assert!(f.catalog.get_active_sku(f.sku.id).await.unwrap().is_none());

        let result = f
            .ledger
            .deduct_and_record(f.item.id, 250, one_unit(f.buyers[0], &f.sku))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(matches!(f.ledger.try_deduct(f.item.id, 250).await, Err(AppError::NotFound(_))));
        assert_eq!(stock(&f).await, 5000);
        assert_eq!(recorded(&f).await, 0);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn failed_insert_rolls_back_the_deduction(pool: PgPool) {
        let f = fixture(pool, 5000).await;

        // No such user: the purchase insert violates its foreign key
        let orphan = one_unit(i64::MAX, &f.sku);
        let result = f.ledger.deduct_and_record(f.item.id, 250, orphan).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert_eq!(stock(&f).await, 5000);
        assert_eq!(recorded(&f).await, 0);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn successful_purchase_is_recorded_with_its_deduction(pool: PgPool) {
        let f = fixture(pool, 5000).await;
        let buyer = f.buyers[0];

        let purchase = NewPurchase {
            user_id: buyer,
            sku_id: f.sku.id,
            quantity: 3,
            total_price: Decimal::new(135000, 2),
        };
        let recorded_purchase = f.ledger.deduct_and_record(f.item.id, 750, purchase).await.unwrap();

        assert_eq!(stock(&f).await, 4250);
        let stored = f.purchases.get_purchase(recorded_purchase.id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, buyer);
        assert_eq!(stored.quantity, 3);
        assert_eq!(stored.total_price.to_string(), "1350.00");

        assert_eq!(f.ledger.try_deduct(f.item.id, 250).await.unwrap(), 4000);
        assert!(matches!(
            f.ledger.set_quantity(f.item.id, -1).await,
            Err(AppError::InvalidQuantity)
        ));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn inactive_sku_is_hidden_from_the_joined_lookup(pool: PgPool) {
        let f = fixture(pool, 5000).await;

        let (sku, item) = f.catalog.get_active_sku(f.sku.id).await.unwrap().unwrap();
        assert_eq!(sku.id, f.sku.id);
        assert_eq!(item.id, f.item.id);
        assert_eq!(item.sale_type, SaleType::Weight);

        f.catalog.set_sku_active(f.sku.id, false).await.unwrap();
        assert!(f.catalog.get_active_sku(f.sku.id).await.unwrap().is_none());
        assert!(f.catalog.list_active_skus(f.item.id).await.unwrap().is_empty());
    }
}
