use crate::user::error::UserError;
use crate::user::repository::UserRepository;
use argon2::{Argon2, PasswordHasher};
use chrono::Utc;
use shared::{LoginRequest, RegisterRequest, User};
use validator::Validate;

#[async_trait::async_trait]
pub trait UserUseCase: Send + Sync {
    async fn register(&self, registration: RegisterRequest) -> Result<User, UserError>;
    async fn login(&self, login: LoginRequest) -> Result<User, UserError>;
    async fn get_user(&self, id: &str) -> Result<User, UserError>;
}

pub struct UserUseCaseImpl<R: UserRepository> {
    pub repo: R,
}

fn hash_password(password: &str) -> Result<String, UserError> {
    let salt = argon2::password_hash::SaltString::generate(
        &mut argon2::password_hash::rand_core::OsRng,
    );
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::Database(format!("Failed to hash password: {}", e)))
}

#[async_trait::async_trait]
impl<R: UserRepository> UserUseCase for UserUseCaseImpl<R> {
    async fn register(&self, registration: RegisterRequest) -> Result<User, UserError> {
        registration
            .validate()
            .map_err(|e| UserError::Validation(e.to_string()))?;

        if self.repo.find_by_email(&registration.email).await?.is_some() {
            return Err(UserError::AlreadyExists("Email".to_string()));
        }
        if self.repo.find_by_username(&registration.username).await?.is_some() {
            return Err(UserError::AlreadyExists("Username".to_string()));
        }

        let user = User::new_for_db(
            registration.username.trim().to_string(),
            registration.display_name.trim().to_string(),
            registration.email.trim().to_lowercase(),
            hash_password(&registration.password)?,
            registration.city_id.clone(),
            Utc::now().fixed_offset(),
        )?;

        Ok(self.repo.create(user).await?)
    }

    async fn login(&self, login: LoginRequest) -> Result<User, UserError> {
        match self.repo.find_by_email(&login.email).await? {
            Some(user) if user.verify_password(&login.password) => Ok(user),
            Some(_) => Err(UserError::InvalidCredentials),
            None => Err(UserError::InvalidCredentials),
        }
    }

    async fn get_user(&self, id: &str) -> Result<User, UserError> {
        self.repo.find_by_id(id).await?.ok_or(UserError::NotFound)
    }
}
