pub mod auth;
pub mod catalog_service;
pub mod inventory_service;
pub mod purchase_service;
