// src/db/memory.rs
//
// In-memory implementation of every store trait. Used by the test suite and
// by `STORAGE_BACKEND=memory`; state is lost on restart.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
};

#[cfg(test)]
use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    common::error::AppError,
    db::store::{CatalogStore, InventoryLedger, PurchaseStore, UserStore},
    models::{
        auth::{NewUser, User},
        inventory::{check_deduct, Item, NewItem, NewSku, Sku},
        purchase::{NewPurchase, Purchase},
    },
};

fn poisoned<T>(_: PoisonError<T>) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("memory store lock poisoned"))
}

#[derive(Default)]
struct Catalog {
    // Each item sits behind its own mutex: that mutex is the per-item lock
    // for every inventory read-check-write.
    items: BTreeMap<i64, Arc<Mutex<Item>>>,
    item_names: HashSet<String>,
    skus: BTreeMap<i64, Sku>,
    sku_codes: HashSet<String>,
}

/// Lock order: `catalog`, then an item mutex, then `purchases`.
/// Nothing holding an item mutex ever takes `catalog`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<i64, User>>,
    catalog: RwLock<Catalog>,
    purchases: Mutex<Vec<Purchase>>,
    next_user_id: AtomicI64,
    next_item_id: AtomicI64,
    next_sku_id: AtomicI64,
    next_purchase_id: AtomicI64,
    #[cfg(test)]
    fail_next_append: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The item's lock cell, cloned out so the catalog lock is released
    /// before the item lock is taken.
    fn item_cell(&self, item_id: i64) -> Result<Option<Arc<Mutex<Item>>>, AppError> {
        let catalog = self.catalog.read().map_err(poisoned)?;
        Ok(catalog.items.get(&item_id).cloned())
    }

    /// Makes the next purchase append fail, to exercise rollback.
    #[cfg(test)]
    pub(crate) fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn append_should_fail(&self) -> bool {
        self.fail_next_append.swap(false, Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn append_should_fail(&self) -> bool {
        false
    }

    fn append_purchase(&self, new_purchase: NewPurchase) -> Result<Purchase, AppError> {
        if self.append_should_fail() {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "injected purchase append failure"
            )));
        }

        let mut purchases = self.purchases.lock().map_err(poisoned)?;
        let purchase = Purchase {
            id: Self::next_id(&self.next_purchase_id),
            user_id: new_purchase.user_id,
            sku_id: new_purchase.sku_id,
            quantity: new_purchase.quantity,
            total_price: new_purchase.total_price,
            created_at: Utc::now(),
        };
        purchases.push(purchase.clone());
        Ok(purchase)
    }
}

// ---
// Users
// ---

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Self::next_id(&self.next_user_id),
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

// ---
// Catalog
// ---

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_item(&self, new_item: NewItem) -> Result<Item, AppError> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        if !catalog.item_names.insert(new_item.name.clone()) {
            return Err(AppError::ItemNameAlreadyExists);
        }

        let now = Utc::now();
        let item = Item {
            id: Self::next_id(&self.next_item_id),
            name: new_item.name,
            category: new_item.category,
            sale_type: new_item.sale_type,
            inventory_qty: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        catalog.items.insert(item.id, Arc::new(Mutex::new(item.clone())));
        Ok(item)
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>, AppError> {
        let Some(cell) = self.item_cell(id)? else {
            return Ok(None);
        };
        let item = cell.lock().map_err(poisoned)?;
        Ok(Some(item.clone()))
    }

    async fn list_active_items(&self) -> Result<Vec<Item>, AppError> {
        let cells: Vec<_> = {
            let catalog = self.catalog.read().map_err(poisoned)?;
            catalog.items.values().cloned().collect()
        };

        let mut items = Vec::with_capacity(cells.len());
        for cell in cells {
            let item = cell.lock().map_err(poisoned)?;
            if item.is_active {
                items.push(item.clone());
            }
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn set_item_active(&self, id: i64, is_active: bool) -> Result<Item, AppError> {
        let cell = self.item_cell(id)?.ok_or(AppError::NotFound("Item"))?;
        let mut item = cell.lock().map_err(poisoned)?;
        item.is_active = is_active;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn create_sku(&self, new_sku: NewSku) -> Result<Sku, AppError> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        if !catalog.items.contains_key(&new_sku.item_id) {
            return Err(AppError::field("item", "Item not found."));
        }
        if !catalog.sku_codes.insert(new_sku.code.clone()) {
            return Err(AppError::SkuCodeAlreadyExists);
        }

        let now = Utc::now();
        let sku = Sku {
            id: Self::next_id(&self.next_sku_id),
            item_id: new_sku.item_id,
            code: new_sku.code,
            unit_value: new_sku.unit_value,
            price: new_sku.price,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        catalog.skus.insert(sku.id, sku.clone());
        Ok(sku)
    }

    async fn get_active_sku(&self, id: i64) -> Result<Option<(Sku, Item)>, AppError> {
        let (sku, cell) = {
            let catalog = self.catalog.read().map_err(poisoned)?;
            let Some(sku) = catalog.skus.get(&id).filter(|s| s.is_active).cloned() else {
                return Ok(None);
            };
            let Some(cell) = catalog.items.get(&sku.item_id).cloned() else {
                return Ok(None);
            };
            (sku, cell)
        };

        let item = cell.lock().map_err(poisoned)?;
        if !item.is_active {
            return Ok(None);
        }
        Ok(Some((sku, item.clone())))
    }

    async fn list_active_skus(&self, item_id: i64) -> Result<Vec<Sku>, AppError> {
        let catalog = self.catalog.read().map_err(poisoned)?;
        let mut skus: Vec<Sku> = catalog
            .skus
            .values()
            .filter(|s| s.item_id == item_id && s.is_active)
            .cloned()
            .collect();
        skus.sort_by_key(|s| (s.unit_value, s.id));
        Ok(skus)
    }

    async fn set_sku_active(&self, id: i64, is_active: bool) -> Result<Sku, AppError> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        let sku = catalog.skus.get_mut(&id).ok_or(AppError::NotFound("SKU"))?;
        sku.is_active = is_active;
        sku.updated_at = Utc::now();
        Ok(sku.clone())
    }
}

// ---
// Inventory
// ---

#[async_trait]
impl InventoryLedger for MemoryStore {
    async fn try_deduct(&self, item_id: i64, amount: i64) -> Result<i64, AppError> {
        let cell = self.item_cell(item_id)?.ok_or(AppError::NotFound("Item"))?;
        let mut item = cell.lock().map_err(poisoned)?;
        if !item.is_active {
            return Err(AppError::NotFound("Item"));
        }

        let remaining = check_deduct(item.inventory_qty, amount)?;
        item.inventory_qty = remaining;
        item.updated_at = Utc::now();
        Ok(remaining)
    }

    async fn set_quantity(&self, item_id: i64, quantity: i64) -> Result<Item, AppError> {
        if quantity < 0 {
            return Err(AppError::InvalidQuantity);
        }

        let cell = self.item_cell(item_id)?.ok_or(AppError::NotFound("Item"))?;
        let mut item = cell.lock().map_err(poisoned)?;
        item.inventory_qty = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn deduct_and_record(
        &self,
        item_id: i64,
        amount: i64,
        purchase: NewPurchase,
    ) -> Result<Purchase, AppError> {
        let cell = self.item_cell(item_id)?.ok_or(AppError::NotFound("Item"))?;
        let mut item = cell.lock().map_err(poisoned)?;
        if !item.is_active {
            return Err(AppError::NotFound("Item"));
        }

        let previous = item.inventory_qty;
        item.inventory_qty = check_deduct(previous, amount)?;

        // The item lock is still held: restoring the quantity on failure is
        // the in-memory equivalent of a rollback.
        match self.append_purchase(purchase) {
            Ok(recorded) => {
                item.updated_at = Utc::now();
                tracing::debug!(
                    item_id,
                    amount,
                    remaining = item.inventory_qty,
                    purchase_id = recorded.id,
                    "inventory deducted"
                );
                Ok(recorded)
            }
            Err(e) => {
                item.inventory_qty = previous;
                Err(e)
            }
        }
    }
}

// ---
// Purchases
// ---

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn get_purchase(&self, id: i64) -> Result<Option<Purchase>, AppError> {
        let purchases = self.purchases.lock().map_err(poisoned)?;
        Ok(purchases.iter().find(|p| p.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Purchase>, AppError> {
        let purchases = self.purchases.lock().map_err(poisoned)?;
        // Appends are in id order, so reversing gives newest first.
        Ok(purchases
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}
