// src/handlers/items.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireAdmin},
    models::{
        inventory::{
            CreateItemPayload, CreateSkuPayload, ItemDetail, ItemView, SetInventoryPayload,
            SkuView,
        },
        purchase::{Purchase, PurchasePayload, PurchaseReceipt},
    },
};

// ---
// Catalog (public reads)
// ---

#[utoipa::path(
    get,
    path = "/api/items/list",
    tag = "Catalog",
    responses(
        (status = 200, description = "Active items ordered by name", body = Vec<ItemView>)
    )
)]
pub async fn list_items(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ItemView>>, AppError> {
    let items = app_state.catalog_service.list_active_items().await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    tag = "Catalog",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item with its active SKUs", body = ItemDetail),
        (status = 404, description = "Unknown or inactive item")
    )
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    WithRejection(Path(item_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Json<ItemDetail>, AppError> {
    let detail = app_state.catalog_service.item_detail(item_id).await?;
    Ok(Json(detail))
}

// ---
// Catalog administration
// ---

#[utoipa::path(
    post,
    path = "/api/items",
    tag = "Catalog",
    request_body = CreateItemPayload,
    responses(
        (status = 201, description = "Item created with zero stock", body = ItemView),
        (status = 400, description = "Invalid data or duplicate name"),
        (status = 403, description = "Admins only")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    WithRejection(Json(payload), _): WithRejection<Json<CreateItemPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let item = app_state.catalog_service.create_item(payload).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    tag = "Catalog",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item deactivated", body = ItemView),
        (status = 404, description = "Unknown item"),
        (status = 403, description = "Admins only")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_item(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    WithRejection(Path(item_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Json<ItemView>, AppError> {
    let item = app_state.catalog_service.deactivate_item(item_id).await?;
    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/api/items/skus",
    tag = "Catalog",
    request_body = CreateSkuPayload,
    responses(
        (status = 201, description = "SKU created", body = SkuView),
        (status = 400, description = "Invalid data, unknown item or duplicate code"),
        (status = 403, description = "Admins only")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sku(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    WithRejection(Json(payload), _): WithRejection<Json<CreateSkuPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let sku = app_state.catalog_service.create_sku(payload).await?;

    Ok((StatusCode::CREATED, Json(sku)))
}

#[utoipa::path(
    delete,
    path = "/api/items/skus/{id}",
    tag = "Catalog",
    params(("id" = i64, Path, description = "SKU id")),
    responses(
        (status = 200, description = "SKU deactivated", body = SkuView),
        (status = 404, description = "Unknown SKU"),
        (status = 403, description = "Admins only")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_sku(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    WithRejection(Path(sku_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Json<SkuView>, AppError> {
    let sku = app_state.catalog_service.deactivate_sku(sku_id).await?;
    Ok(Json(sku))
}

// ---
// Inventory
// ---

#[utoipa::path(
    post,
    path = "/api/items/{id}/inventory",
    tag = "Inventory",
    request_body = SetInventoryPayload,
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Inventory overwritten", body = ItemView),
        (status = 400, description = "Negative or non-integer quantity"),
        (status = 404, description = "Unknown item"),
        (status = 403, description = "Admins only")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_inventory(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    WithRejection(Path(item_id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<SetInventoryPayload>, AppError>,
) -> Result<Json<ItemView>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let item = app_state
        .inventory_service
        .set_inventory(item_id, payload.quantity)
        .await?;

    Ok(Json(item))
}

// ---
// Purchases
// ---

#[utoipa::path(
    post,
    path = "/api/items/purchase",
    tag = "Purchases",
    request_body = PurchasePayload,
    responses(
        (status = 201, description = "Purchase recorded", body = PurchaseReceipt),
        (status = 400, description = "Invalid quantity, out of stock or insufficient inventory"),
        (status = 404, description = "Unknown or inactive SKU"),
        (status = 401, description = "Not authenticated")
    ),
    security(("api_jwt" = []))
)]
pub async fn purchase(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<PurchasePayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let receipt = app_state
        .purchase_service
        .purchase(&user, payload.sku_id, payload.quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[utoipa::path(
    get,
    path = "/api/items/purchases",
    tag = "Purchases",
    responses(
        (status = 200, description = "The caller's purchases, newest first", body = Vec<Purchase>),
        (status = 401, description = "Not authenticated")
    ),
    security(("api_jwt" = []))
)]
pub async fn my_purchases(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Purchase>>, AppError> {
    let purchases = app_state.purchase_service.my_purchases(&user).await?;
    Ok(Json(purchases))
}

#[utoipa::path(
    get,
    path = "/api/items/purchases/{id}",
    tag = "Purchases",
    params(("id" = i64, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Purchase record", body = Purchase),
        (status = 404, description = "Unknown purchase or not visible to the caller"),
        (status = 401, description = "Not authenticated")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_purchase(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    WithRejection(Path(purchase_id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Json<Purchase>, AppError> {
    let purchase = app_state
        .purchase_service
        .get_purchase(&user, purchase_id)
        .await?;
    Ok(Json(purchase))
}
