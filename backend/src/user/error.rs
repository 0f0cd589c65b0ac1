use crate::error::ApiError;
use shared::SharedError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("User not found")]
    NotFound,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0} is already taken")]
    AlreadyExists(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Session error: {0}")]
    Session(String),
}

impl From<SharedError> for UserError {
    fn from(err: SharedError) -> Self {
        match err {
            SharedError::Validation(msg) | SharedError::BadRequest(msg) => UserError::Validation(msg),
            SharedError::NotFound(_) => UserError::NotFound,
            SharedError::Conflict(msg) => UserError::AlreadyExists(msg),
            other => UserError::Database(other.to_string()),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => ApiError::not_found(&err.to_string()),
            UserError::InvalidCredentials => ApiError::unauthorized(&err.to_string()),
            UserError::AlreadyExists(_) => ApiError::conflict(&err.to_string()),
            UserError::Validation(msg) => ApiError::validation_error(&msg),
            UserError::Database(msg) => ApiError::database_error(&msg),
            UserError::Session(msg) => ApiError::internal_error(&msg),
        }
    }
}
