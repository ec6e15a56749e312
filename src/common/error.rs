// src/common/error.rs

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] ValidationErrors),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid path parameter: {0}")]
    InvalidPath(String),

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Item name already exists")]
    ItemNameAlreadyExists,

    #[error("SKU code already exists")]
    SkuCodeAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Item is out of stock")]
    OutOfStock,

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    // Catch-all for anything unexpected; anyhow keeps the context for the logs.
    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// A single field-level validation error, rendered like the ones `validator` produces.
    pub fn field(field: &'static str, message: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, ValidationError::new("invalid").with_message(message.into()));
        AppError::ValidationError(errors)
    }
}

// Malformed JSON, wrong types and missing fields are client errors (400), not 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidPath(rejection.body_text())
    }
}

fn field_error_body(field: &str, message: &str) -> Json<serde_json::Value> {
    Json(json!({
        "error": message,
        "details": { field: [message] },
    }))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "One or more fields are invalid.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidBody(reason) => {
                let body = Json(json!({
                    "error": "Invalid request body.",
                    "details": { "body": [reason] },
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidPath(reason) => {
                let body = Json(json!({
                    "error": "Invalid path parameter.",
                    "details": { "path": [reason] },
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::EmailAlreadyExists => {
                let body = field_error_body("email", "A user with this email already exists.");
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::ItemNameAlreadyExists => {
                let body = field_error_body("name", "An item with this name already exists.");
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::SkuCodeAlreadyExists => {
                let body = field_error_body("code", "A SKU with this code already exists.");
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InsufficientStock { requested, available } => {
                let message = format!(
                    "Insufficient inventory: requested {}, available {}.",
                    requested, available
                );
                let body = Json(json!({ "error": message }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password.")
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided or are invalid.",
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
            AppError::NotFound(what) => {
                let body = Json(json!({ "error": format!("{} not found.", what) }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            AppError::OutOfStock => (StatusCode::BAD_REQUEST, "Item is out of stock."),
            AppError::InvalidQuantity => (StatusCode::BAD_REQUEST, "Invalid quantity."),

            // Everything else (database, hashing, tokens, anyhow) becomes a 500.
            // The detailed cause goes to the log, never to the client.
            ref e => {
                tracing::error!(error = ?e, "Internal server error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred.")
            }
        };

        // Default body for errors that carry a single message.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
