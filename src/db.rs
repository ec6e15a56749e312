pub mod store;
pub use store::{CatalogStore, InventoryLedger, PurchaseStore, UserStore};
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod purchase_repo;
pub use purchase_repo::PurchaseRepository;
pub mod memory;
pub use memory::MemoryStore;
