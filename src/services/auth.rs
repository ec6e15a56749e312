// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserStore,
    models::auth::{
        AccessToken, Claims, NewUser, RegisterUserPayload, Role, TokenPair, TokenType, User,
    },
};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    bcrypt_cost: u32,
}

// Emails are compared case-insensitively; they are stored lowercase.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt_secret: String,
        access_ttl: Duration,
        refresh_ttl: Duration,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            jwt_secret,
            access_ttl,
            refresh_ttl,
            bcrypt_cost,
        }
    }

    // ---
    // Accounts
    // ---

    /// Public sign-up. Always creates a customer, whatever the payload says.
    pub async fn register_customer(&self, payload: RegisterUserPayload) -> Result<User, AppError> {
        self.create_account(&payload.name, &payload.email, &payload.password, Role::Customer)
            .await
    }

    pub async fn create_cashier(&self, payload: RegisterUserPayload) -> Result<User, AppError> {
        self.create_account(&payload.name, &payload.email, &payload.password, Role::Cashier)
            .await
    }

    /// Creates the configured admin account unless the email is already taken.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, AppError> {
        if let Some(existing) = self.users.find_by_email(&normalize_email(email)).await? {
            tracing::info!(user_id = existing.id, "bootstrap admin already present");
            return Ok(existing);
        }

        self.create_account(name, email, password, Role::Admin).await
    }

    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::field("name", "Name is required."));
        }

        // 1. Hashing is CPU-bound, keep it off the async workers
        let password_clone = password.to_owned();
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash(&password_clone, cost))
            .await
            .map_err(|e| anyhow::anyhow!("password hashing task failed: {}", e))??;

        // 2. Persist (the store reports duplicate emails)
        let user = self
            .users
            .create_user(NewUser {
                email: normalize_email(email),
                name: name.to_string(),
                password_hash,
                role,
            })
            .await?;

        tracing::info!(user_id = user.id, role = ?user.role, "account created");
        Ok(user)
    }

    // ---
    // Tokens
    // ---

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        Ok(TokenPair {
            access: self.create_token(&user, TokenType::Access)?,
            refresh: self.create_token(&user, TokenType::Refresh)?,
        })
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, AppError> {
        let user = self.user_for_token(refresh_token, TokenType::Refresh).await?;
        Ok(AccessToken {
            access: self.create_token(&user, TokenType::Access)?,
        })
    }

    /// Resolves an access token to the current state of its user.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        self.user_for_token(token, TokenType::Access).await
    }

    async fn user_for_token(&self, token: &str, expected: TokenType) -> Result<User, AppError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?
        .claims;

        if claims.token_type != expected {
            return Err(AppError::InvalidToken);
        }

        let user_id: i64 = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

        // Re-loaded on every request: a removed user loses access immediately
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn create_token(&self, user: &User, token_type: TokenType) -> Result<String, AppError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            token_type,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            "test-secret".to_string(),
            Duration::minutes(5),
            Duration::days(1),
            4,
        )
    }

    fn payload(email: &str) -> RegisterUserPayload {
        RegisterUserPayload {
            name: "Test Customer".to_string(),
            email: email.to_string(),
            password: "SecurePass123!".to_string(),
        }
    }

    #[tokio::test]
    async fn registration_always_creates_customers() {
        let auth = service();
        let user = auth.register_customer(payload("customer@example.com")).await.unwrap();
        assert_eq!(user.role, Role::Customer);
        assert_ne!(user.password_hash, "SecurePass123!");
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected_case_insensitively() {
        let auth = service();
        auth.register_customer(payload("customer@example.com")).await.unwrap();
        let dup = auth.register_customer(payload("Customer@Example.com")).await;
        assert!(matches!(dup, Err(AppError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn login_issues_a_pair_that_resolves_to_the_user() {
        let auth = service();
        let user = auth.register_customer(payload("customer@example.com")).await.unwrap();

        let pair = auth.login("customer@example.com", "SecurePass123!").await.unwrap();
        let resolved = auth.validate_token(&pair.access).await.unwrap();
        assert_eq!(resolved.id, user.id);

        let refreshed = auth.refresh(&pair.refresh).await.unwrap();
        assert_eq!(auth.validate_token(&refreshed.access).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let auth = service();
        auth.register_customer(payload("customer@example.com")).await.unwrap();

        let wrong = auth.login("customer@example.com", "nope-nope").await;
        let unknown = auth.login("ghost@example.com", "SecurePass123!").await;
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn token_types_are_not_interchangeable() {
        let auth = service();
        auth.register_customer(payload("customer@example.com")).await.unwrap();
        let pair = auth.login("customer@example.com", "SecurePass123!").await.unwrap();

        assert!(matches!(auth.validate_token(&pair.refresh).await, Err(AppError::InvalidToken)));
        assert!(matches!(auth.refresh(&pair.access).await, Err(AppError::InvalidToken)));
        assert!(matches!(auth.validate_token("garbage").await, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let auth = service();
        let first = auth
            .ensure_admin("admin@example.com", "AdminPass123!", "Admin")
            .await
            .unwrap();
        let second = auth
            .ensure_admin("admin@example.com", "AdminPass123!", "Admin")
            .await
            .unwrap();
        assert_eq!(first.role, Role::Admin);
        assert_eq!(first.id, second.id);
    }
}
