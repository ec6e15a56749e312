// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::get_me,
        handlers::auth::create_cashier,

        // --- Catalog ---
        handlers::items::list_items,
        handlers::items::get_item,
        handlers::items::create_item,
        handlers::items::deactivate_item,
        handlers::items::create_sku,
        handlers::items::deactivate_sku,

        // --- Inventory ---
        handlers::items::set_inventory,

        // --- Purchases ---
        handlers::items::purchase,
        handlers::items::my_purchases,
        handlers::items::get_purchase,
    ),
    components(
        schemas(
            handlers::health::HealthStatus,

            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::RefreshTokenPayload,
            models::auth::TokenPair,
            models::auth::AccessToken,

            // --- Catalog ---
            models::inventory::Category,
            models::inventory::SaleType,
            models::inventory::InventoryUnit,
            models::inventory::Item,
            models::inventory::ItemView,
            models::inventory::Sku,
            models::inventory::SkuView,
            models::inventory::ItemDetail,
            models::inventory::CreateItemPayload,
            models::inventory::CreateSkuPayload,
            models::inventory::SetInventoryPayload,

            // --- Purchases ---
            models::purchase::Purchase,
            models::purchase::SkuSummary,
            models::purchase::PurchaseReceipt,
            models::purchase::PurchasePayload,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "Accounts and tokens"),
        (name = "Catalog", description = "Items and SKUs"),
        (name = "Inventory", description = "Stock levels"),
        (name = "Purchases", description = "Buying and purchase history")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
