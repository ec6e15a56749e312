// src/db/store.rs
//
// The seams between services and storage. Every trait has a Postgres
// implementation (the repositories) and an in-memory one (MemoryStore).

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    models::{
        auth::{NewUser, User},
        inventory::{Item, NewItem, NewSku, Sku},
        purchase::{NewPurchase, Purchase},
    },
};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Fails with `EmailAlreadyExists` when the email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fails with `ItemNameAlreadyExists` when the name is taken.
    async fn create_item(&self, new_item: NewItem) -> Result<Item, AppError>;

    /// Any item, active or not.
    async fn get_item(&self, id: i64) -> Result<Option<Item>, AppError>;

    async fn list_active_items(&self) -> Result<Vec<Item>, AppError>;

    async fn set_item_active(&self, id: i64, is_active: bool) -> Result<Item, AppError>;

    /// Fails with `SkuCodeAlreadyExists` when the code is taken.
    async fn create_sku(&self, new_sku: NewSku) -> Result<Sku, AppError>;

    /// The SKU and its parent item, only when both are active.
    async fn get_active_sku(&self, id: i64) -> Result<Option<(Sku, Item)>, AppError>;

    async fn list_active_skus(&self, item_id: i64) -> Result<Vec<Sku>, AppError>;

    async fn set_sku_active(&self, id: i64, is_active: bool) -> Result<Sku, AppError>;
}

/// Owner of `items.inventory_qty`.
///
/// Every read-check-write on an item's quantity runs under a lock keyed by the
/// item id, so concurrent deductions on one item behave as if run one after
/// the other. Deductions on different items never wait on each other.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Atomically deducts `amount` and returns the new quantity.
    ///
    /// `OutOfStock` when the quantity is zero, `InsufficientStock` when it is
    /// positive but below `amount`, `NotFound` for unknown or inactive items.
    async fn try_deduct(&self, item_id: i64, amount: i64) -> Result<i64, AppError>;

    /// Administrative overwrite of the quantity. Not a delta.
    async fn set_quantity(&self, item_id: i64, quantity: i64) -> Result<Item, AppError>;

    /// `try_deduct` and the purchase append in one transaction: either both
    /// happen or neither does.
    async fn deduct_and_record(
        &self,
        item_id: i64,
        amount: i64,
        purchase: NewPurchase,
    ) -> Result<Purchase, AppError>;
}

/// Read side of the append-only purchase log. Appends go through
/// `InventoryLedger::deduct_and_record`.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn get_purchase(&self, id: i64) -> Result<Option<Purchase>, AppError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Purchase>, AppError>;
}
