use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, FixedOffset};
use crate::error::{Result, SharedError};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_.]+$").unwrap();
}

/// Collection holding user documents
pub const USER_COLLECTION: &str = "user";

/// Represents a dancer, organizer or viewer account
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct User {
    /// ArangoDB document ID (format: "user/{key}")
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// ArangoDB document revision
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,

    /// Unique handle used for tagging
    #[validate(length(min = 3, max = 30))]
    #[validate(regex = "USERNAME_REGEX")]
    pub username: String,

    #[validate(length(min = 1, max = 100))]
    #[serde(rename = "displayName")]
    pub display_name: String,

    #[validate(email)]
    pub email: String,

    /// Argon2 hash
    #[validate(length(min = 1))]
    pub password: String,

    /// Home city (format: "city/{key}")
    #[serde(rename = "cityId", default)]
    pub city_id: Option<String>,

    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<FixedOffset>,
}

impl User {
    /// Creates a new user for database insertion (ArangoDB will set id and rev)
    pub fn new_for_db(
        username: String,
        display_name: String,
        email: String,
        password: String,
        city_id: Option<String>,
        created_at: DateTime<FixedOffset>,
    ) -> Result<Self> {
        let user = Self {
            id: String::new(),
            rev: String::new(),
            username,
            display_name,
            email,
            password,
            city_id,
            is_admin: false,
            created_at,
        };
        user.validate_fields()?;
        Ok(user)
    }

    pub fn validate_fields(&self) -> Result<()> {
        self.validate()
            .map_err(|e| SharedError::Validation(e.to_string()))
    }

    pub fn verify_password(&self, password: &str) -> bool {
        if let Ok(parsed_hash) = PasswordHash::new(&self.password) {
            Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok()
        } else {
            false
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// The public face of a user, embedded in other payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::PasswordHasher;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn hash(password: &str) -> String {
        let salt = argon2::password_hash::SaltString::generate(
            &mut argon2::password_hash::rand_core::OsRng,
        );
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    fn create_test_user() -> User {
        User::new_for_db(
            "b_boy.kid".to_string(),
            "Kid".to_string(),
            "kid@example.com".to_string(),
            hash("windmill123"),
            None,
            Utc::now().fixed_offset(),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_password() {
        let user = create_test_user();
        assert!(user.verify_password("windmill123"));
        assert!(!user.verify_password("headspin"));
    }

    #[test]
    fn test_invalid_hash_never_verifies() {
        let mut user = create_test_user();
        user.password = "plain".to_string();
        assert!(!user.verify_password("plain"));
    }

    #[test]
    fn test_username_rules() {
        let mut user = create_test_user();
        user.username = "no spaces".to_string();
        assert!(user.validate_fields().is_err());
        user.username = "ab".to_string();
        assert!(user.validate_fields().is_err());
        user.username = "popper_99".to_string();
        assert!(user.validate_fields().is_ok());
    }

    #[test]
    fn test_summary_hides_private_fields() {
        let user = create_test_user();
        let json = serde_json::to_value(user.summary()).unwrap();
        assert_eq!(json["username"], "b_boy.kid");
        assert!(json.get("email").is_none());
        assert!(json.get("password").is_none());
    }
}
