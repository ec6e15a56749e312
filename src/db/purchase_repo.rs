// src/db/purchase_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::store::PurchaseStore,
    models::purchase::{NewPurchase, Purchase},
};

#[derive(Clone)]
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends a purchase record.
    /// Generic over the executor so it can run inside the deduction transaction.
    pub async fn insert_purchase<'e, E>(
        &self,
        executor: E,
        new_purchase: &NewPurchase,
    ) -> Result<Purchase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (user_id, sku_id, quantity, total_price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new_purchase.user_id)
        .bind(new_purchase.sku_id)
        .bind(new_purchase.quantity)
        .bind(new_purchase.total_price)
        .fetch_one(executor)
        .await?;

        Ok(purchase)
    }
}

#[async_trait]
impl PurchaseStore for PurchaseRepository {
    async fn get_purchase(&self, id: i64) -> Result<Option<Purchase>, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(purchase)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Purchase>, AppError> {
        let purchases = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }
}
