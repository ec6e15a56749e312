// src/app.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/items/list", get(handlers::items::list_items))
        .route("/items/{id}", get(handlers::items::get_item));

    // Routes that need a valid access token. Role checks happen in the handlers.
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        .route("/auth/cashiers", post(handlers::auth::create_cashier))
        .route("/items", post(handlers::items::create_item))
        .route("/items/{id}", delete(handlers::items::deactivate_item))
        .route("/items/{id}/inventory", post(handlers::items::set_inventory))
        .route("/items/skus", post(handlers::items::create_sku))
        .route("/items/skus/{id}", delete(handlers::items::deactivate_sku))
        .route("/items/purchase", post(handlers::items::purchase))
        .route("/items/purchases", get(handlers::items::my_purchases))
        .route("/items/purchases/{id}", get(handlers::items::get_purchase))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(app_state)
}
