// src/db/catalog_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::store::CatalogStore,
    models::inventory::{Item, NewItem, NewSku, Sku},
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    // ---
    // Items
    // ---

    async fn create_item(&self, new_item: NewItem) -> Result<Item, AppError> {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, category, sale_type)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&new_item.name)
        .bind(new_item.category)
        .bind(new_item.sale_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::ItemNameAlreadyExists;
                }
            }
            e.into()
        })
    }

    async fn get_item(&self, id: i64) -> Result<Option<Item>, AppError> {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn list_active_items(&self) -> Result<Vec<Item>, AppError> {
        let items = sqlx::query_as::<_, Item>(
            "SELECT * FROM items WHERE is_active = TRUE ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn set_item_active(&self, id: i64, is_active: bool) -> Result<Item, AppError> {
        sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET is_active = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Item"))
    }

    // ---
    // SKUs
    // ---

    async fn create_sku(&self, new_sku: NewSku) -> Result<Sku, AppError> {
        sqlx::query_as::<_, Sku>(
            r#"
            INSERT INTO skus (item_id, code, unit_value, price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_sku.item_id)
        .bind(&new_sku.code)
        .bind(new_sku.unit_value)
        .bind(new_sku.price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::SkuCodeAlreadyExists;
                }
                if db_err.is_foreign_key_violation() {
                    return AppError::field("item", "Item not found.");
                }
            }
            e.into()
        })
    }

    async fn get_active_sku(&self, id: i64) -> Result<Option<(Sku, Item)>, AppError> {
        let sku = sqlx::query_as::<_, Sku>(
            r#"
            SELECT s.*
            FROM skus s
            JOIN items i ON i.id = s.item_id
            WHERE s.id = $1 AND s.is_active = TRUE AND i.is_active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(sku) = sku else {
            return Ok(None);
        };

        // The item can be deactivated in between; the ledger re-checks under lock.
        let item =
            sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 AND is_active = TRUE")
                .bind(sku.item_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(item.map(|item| (sku, item)))
    }

    async fn list_active_skus(&self, item_id: i64) -> Result<Vec<Sku>, AppError> {
        let skus = sqlx::query_as::<_, Sku>(
            r#"
            SELECT * FROM skus
            WHERE item_id = $1 AND is_active = TRUE
            ORDER BY unit_value ASC, id ASC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(skus)
    }

    async fn set_sku_active(&self, id: i64, is_active: bool) -> Result<Sku, AppError> {
        sqlx::query_as::<_, Sku>(
            r#"
            UPDATE skus SET is_active = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("SKU"))
    }
}
