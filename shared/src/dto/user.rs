use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, FixedOffset};
use crate::models::user::{User, USERNAME_REGEX};

/// Data Transfer Object for User
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserDto {
    /// User's ID (ArangoDB _id field)
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub email: String,
    #[serde(rename = "cityId")]
    pub city_id: Option<String>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<FixedOffset>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            city_id: user.city_id.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// Request for user registration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30))]
    #[validate(regex = "USERNAME_REGEX")]
    pub username: String,

    #[serde(rename = "displayName")]
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,

    #[serde(rename = "cityId", default)]
    pub city_id: Option<String>,
}

/// Request for user login
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Response for successful login or registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserDto,
    /// Session ID for authentication
    pub session_id: String,
}
