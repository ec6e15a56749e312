// src/models/purchase.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::inventory::{SaleType, Sku};

// --- Purchase record (append-only) ---
// total_price is a snapshot: it is never recomputed from the SKU's current price.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Purchase {
    #[schema(example = 1)]
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    #[serde(rename = "sku")]
    pub sku_id: i64,
    #[schema(example = 3)]
    pub quantity: i64,
    #[schema(value_type = String, example = "1350.00")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub user_id: i64,
    pub sku_id: i64,
    pub quantity: i64,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkuSummary {
    pub id: i64,
    #[schema(example = "KK-250")]
    pub code: String,
    #[schema(example = 250)]
    pub unit_value: i64,
    #[schema(value_type = String, example = "450.00")]
    pub price: Decimal,
    #[schema(example = "250g")]
    pub display_unit: String,
}

impl SkuSummary {
    pub fn new(sku: &Sku, sale_type: SaleType) -> Self {
        Self {
            id: sku.id,
            code: sku.code.clone(),
            unit_value: sku.unit_value,
            price: sku.price,
            display_unit: sale_type.display_unit(sku.unit_value),
        }
    }
}

/// Receipt returned by a successful purchase: the record with the SKU embedded.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseReceipt {
    pub id: i64,
    pub user: i64,
    pub sku: SkuSummary,
    pub quantity: i64,
    #[schema(value_type = String, example = "1350.00")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl PurchaseReceipt {
    pub fn new(purchase: Purchase, sku: SkuSummary) -> Self {
        Self {
            id: purchase.id,
            user: purchase.user_id,
            sku,
            quantity: purchase.quantity,
            total_price: purchase.total_price,
            created_at: purchase.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PurchasePayload {
    #[schema(example = 1)]
    pub sku_id: i64,

    #[validate(range(min = 1, message = "Quantity must be a positive integer."))]
    #[schema(example = 3)]
    pub quantity: i64,
}
