// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    models::auth::{Role, User},
};

/// 1. A role requirement: the set of roles allowed through.
pub trait RoleDef: Send + Sync + 'static {
    fn allowed() -> &'static [Role];
}

/// 2. The extractor (guard). Carries the user that passed the check.
/// Runs after `auth_guard`, so a missing user means the route was not layered.
pub struct RequireRole<T>(pub User, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or(AppError::InvalidToken)?;

        if !T::allowed().contains(&user.role) {
            tracing::warn!(user_id = user.id, role = ?user.role, "role check failed");
            return Err(AppError::Forbidden);
        }

        Ok(RequireRole(user, PhantomData))
    }
}

// --- Role sets ---

pub struct AdminOnly;

impl RoleDef for AdminOnly {
    fn allowed() -> &'static [Role] {
        &[Role::Admin]
    }
}

pub type RequireAdmin = RequireRole<AdminOnly>;
