use thiserror::Error;
use validator::ValidationErrors;
use serde_json::Error as JsonError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
pub enum SharedError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Required field missing: {0}")]
    MissingField(String),
}

impl SharedError {
    /// Stable machine-readable code, mirrored in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            SharedError::Database(_) => "DATABASE_ERROR",
            SharedError::Validation(_) => "VALIDATION_ERROR",
            SharedError::NotFound(_) => "NOT_FOUND",
            SharedError::Unauthorized(_) => "UNAUTHORIZED",
            SharedError::Forbidden(_) => "FORBIDDEN",
            SharedError::BadRequest(_) => "BAD_REQUEST",
            SharedError::Conflict(_) => "CONFLICT",
            SharedError::Conversion(_) => "BAD_REQUEST",
            SharedError::Storage(_) => "STORAGE_ERROR",
            SharedError::Internal(_) => "INTERNAL_ERROR",
            SharedError::MissingField(_) => "BAD_REQUEST",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            SharedError::Validation(_)
            | SharedError::BadRequest(_)
            | SharedError::Conversion(_)
            | SharedError::MissingField(_) => 400,
            SharedError::Unauthorized(_) => 401,
            SharedError::Forbidden(_) => 403,
            SharedError::NotFound(_) => 404,
            SharedError::Conflict(_) => 409,
            SharedError::Database(_) | SharedError::Storage(_) | SharedError::Internal(_) => 500,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl actix_web::ResponseError for SharedError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.http_status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(actix_web::ResponseError::status_code(self)).json(self)
    }
}

impl From<ValidationErrors> for SharedError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<JsonError> for SharedError {
    fn from(error: JsonError) -> Self {
        Self::Conversion(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SharedError>;
