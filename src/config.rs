// src/config.rs

use std::{env, fmt::Display, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CatalogRepository, CatalogStore, InventoryLedger, InventoryRepository, MemoryStore,
        PurchaseRepository, PurchaseStore, UserRepository, UserStore,
    },
    services::{
        auth::AuthService, catalog_service::CatalogService, inventory_service::InventoryService,
        purchase_service::PurchaseService,
    },
};

// ---
// Configuration
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!(
                "unknown storage backend '{}' (expected postgres or memory)",
                other
            )),
        }
    }
}

/// Account created at startup when it does not exist yet.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub storage: StorageBackend,
    /// Required for the Postgres backend only.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
    pub admin: Option<AdminAccount>,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;

        let storage = parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = lookup("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORAGE_BACKEND is postgres"));
        }

        let access_minutes: i64 = parse_or(&lookup, "ACCESS_TOKEN_TTL_MINUTES", 60)?;
        let refresh_days: i64 = parse_or(&lookup, "REFRESH_TOKEN_TTL_DAYS", 7)?;

        // The admin account is all or nothing; the name is optional
        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminAccount {
                email,
                password,
                name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            }),
            (None, None) => None,
            _ => return Err(anyhow!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together")),
        };

        Ok(Self {
            jwt_secret,
            storage,
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            access_token_ttl: chrono::Duration::minutes(access_minutes),
            refresh_token_ttl: chrono::Duration::days(refresh_days),
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            admin,
        })
    }

    /// In-memory configuration with defaults, for tests and local runs.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            storage: StorageBackend::Memory,
            database_url: None,
            db_max_connections: 5,
            bind_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: chrono::Duration::minutes(60),
            refresh_token_ttl: chrono::Duration::days(7),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin: None,
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value for {}: {}", name, e)),
        None => Ok(default),
    }
}

// ---
// Shared state
// ---

// Cloned into every handler; services hold their stores behind Arcs.
#[derive(Clone)]
pub struct AppState {
    /// Present for the Postgres backend.
    pub db_pool: Option<PgPool>,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub inventory_service: InventoryService,
    pub purchase_service: PurchaseService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let state = match config.storage {
            StorageBackend::Postgres => Self::postgres(config).await?,
            StorageBackend::Memory => {
                tracing::warn!("using the in-memory store: data is lost on restart");
                Self::in_memory(config)
            }
        };

        if let Some(admin) = &config.admin {
            state
                .auth_service
                .ensure_admin(&admin.email, &admin.password, &admin.name)
                .await
                .context("failed to create the bootstrap admin")?;
        }

        Ok(state)
    }

    async fn postgres(config: &Config) -> anyhow::Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set")?;

        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .context("failed to connect to the database")?;

        tracing::info!("database connection established");

        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("failed to run database migrations")?;

        tracing::info!("database migrations applied");

        // --- Wire up the dependency graph ---
        let users = Arc::new(UserRepository::new(db_pool.clone()));
        let catalog = Arc::new(CatalogRepository::new(db_pool.clone()));
        let ledger = Arc::new(InventoryRepository::new(db_pool.clone()));
        let purchases = Arc::new(PurchaseRepository::new(db_pool.clone()));

        Ok(Self::assemble(Some(db_pool), users, catalog, ledger, purchases, config))
    }

    /// State backed by a fresh `MemoryStore`. Does not create the bootstrap admin.
    pub fn in_memory(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::assemble(None, store.clone(), store.clone(), store.clone(), store, config)
    }

    fn assemble(
        db_pool: Option<PgPool>,
        users: Arc<dyn UserStore>,
        catalog: Arc<dyn CatalogStore>,
        ledger: Arc<dyn InventoryLedger>,
        purchases: Arc<dyn PurchaseStore>,
        config: &Config,
    ) -> Self {
        let auth_service = AuthService::new(
            users,
            config.jwt_secret.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
            config.bcrypt_cost,
        );

        Self {
            db_pool,
            auth_service,
            catalog_service: CatalogService::new(catalog.clone()),
            inventory_service: InventoryService::new(ledger.clone()),
            purchase_service: PurchaseService::new(catalog, ledger, purchases),
        }
    }
}
