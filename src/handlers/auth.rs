// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::WithRejection;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireAdmin},
    models::auth::{
        AccessToken, LoginUserPayload, RefreshTokenPayload, RegisterUserPayload, TokenPair, User,
    },
};

// Public sign-up: the account is always a customer
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Customer registered", body = User),
        (status = 400, description = "Invalid data or email already registered")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterUserPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let user = app_state.auth_service.register_customer(payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenPair),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginUserPayload>, AppError>,
) -> Result<Json<TokenPair>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let tokens = app_state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RefreshTokenPayload>, AppError>,
) -> Result<Json<AccessToken>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let token = app_state.auth_service.refresh(&payload.refresh).await?;

    Ok(Json(token))
}

// Protected route /me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The authenticated user", body = User),
        (status = 401, description = "Not authenticated")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

#[utoipa::path(
    post,
    path = "/api/auth/cashiers",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Cashier created", body = User),
        (status = 400, description = "Invalid data or email already registered"),
        (status = 403, description = "Admins only")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_cashier(
    State(app_state): State<AppState>,
    _guard: RequireAdmin,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterUserPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let user = app_state.auth_service.create_cashier(payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}
