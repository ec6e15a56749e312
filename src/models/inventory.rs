// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::common::error::AppError;

// --- 1. Categories and sale types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "item_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dry,
    Milk,
    Other,
}

/// How an item is sold. Fixed at creation: it decides the inventory unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleType {
    Weight,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InventoryUnit {
    Grams,
    Pieces,
}

impl SaleType {
    pub fn inventory_unit(self) -> InventoryUnit {
        match self {
            SaleType::Weight => InventoryUnit::Grams,
            SaleType::Count => InventoryUnit::Pieces,
        }
    }

    /// Human readable size of one SKU unit, e.g. `250g`, `1.5kg`, `1pc`, `6pcs`.
    pub fn display_unit(self, unit_value: i64) -> String {
        match self {
            SaleType::Weight if unit_value >= 1000 => {
                format!("{:.1}kg", unit_value as f64 / 1000.0)
            }
            SaleType::Weight => format!("{}g", unit_value),
            SaleType::Count if unit_value == 1 => "1pc".to_string(),
            SaleType::Count => format!("{}pcs", unit_value),
        }
    }
}

// --- 2. Items ---
// inventory_qty is grams for weight items and pieces for count items.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Item {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Kaju Katli")]
    pub name: String,
    pub category: Category,
    pub sale_type: SaleType,
    #[schema(example = 5000)]
    pub inventory_qty: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub category: Category,
    pub sale_type: SaleType,
}

// Item + derived unit, as returned by every item endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub inventory_unit: InventoryUnit,
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        let inventory_unit = item.sale_type.inventory_unit();
        Self { item, inventory_unit }
    }
}

// --- 3. SKUs ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Sku {
    #[schema(example = 1)]
    pub id: i64,
    #[serde(rename = "item")]
    #[schema(example = 1)]
    pub item_id: i64,
    #[schema(example = "KK-250")]
    pub code: String,
    #[schema(example = 250)]
    pub unit_value: i64,
    #[schema(value_type = String, example = "450.00")]
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSku {
    pub item_id: i64,
    pub code: String,
    pub unit_value: i64,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkuView {
    #[serde(flatten)]
    pub sku: Sku,
    #[schema(example = "250g")]
    pub display_unit: String,
}

impl SkuView {
    pub fn new(sku: Sku, sale_type: SaleType) -> Self {
        let display_unit = sale_type.display_unit(sku.unit_value);
        Self { sku, display_unit }
    }
}

/// Public detail page: the item plus its active SKUs only.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: ItemView,
    pub skus: Vec<SkuView>,
}

// --- 4. Deduction rule ---

/// The check-and-deduct rule shared by every ledger implementation.
///
/// Callers must hold the item's lock while applying it. Zero stock and
/// partial stock fail with different errors so clients can tell them apart.
pub fn check_deduct(current: i64, amount: i64) -> Result<i64, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidQuantity);
    }
    if current == 0 {
        return Err(AppError::OutOfStock);
    }
    if current < amount {
        return Err(AppError::InsufficientStock {
            requested: amount,
            available: current,
        });
    }
    Ok(current - amount)
}

// ---
// Payloads
// ---

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || price.is_zero() {
        return Err(ValidationError::new("range").with_message("Price must be positive.".into()));
    }
    if price.normalize().scale() > 2 {
        return Err(ValidationError::new("scale")
            .with_message("Ensure that there are no more than 2 decimal places.".into()));
    }
    if *price >= Decimal::from(100_000_000) {
        return Err(ValidationError::new("range")
            .with_message("Ensure that there are no more than 10 digits in total.".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemPayload {
    #[validate(length(min = 1, max = 255, message = "Name is required (max 255 characters)."))]
    #[schema(example = "Kaju Katli")]
    pub name: String,

    pub category: Category,

    pub sale_type: SaleType,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSkuPayload {
    #[schema(example = 1)]
    pub item: i64,

    #[validate(length(min = 1, max = 50, message = "SKU code is required (max 50 characters)."))]
    #[schema(example = "KK-250")]
    pub code: String,

    #[validate(range(min = 1, message = "Unit value must be a positive integer."))]
    #[schema(example = 250)]
    pub unit_value: i64,

    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = String, example = "450.00")]
    pub price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetInventoryPayload {
    #[validate(range(min = 0, message = "Quantity cannot be negative."))]
    #[schema(example = 5000)]
    pub quantity: i64,
}
