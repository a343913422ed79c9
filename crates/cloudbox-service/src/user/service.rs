//! Registration, login and account removal.

use std::sync::Arc;

use tracing::{info, warn};

use cloudbox_auth::password::{PasswordHasher, PasswordValidator};
use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::types::UserId;
use cloudbox_database::UserStore;
use cloudbox_entity::user::{CreateUser, User};

/// Shortest and longest accepted usernames.
const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=64;

/// Handles user accounts.
#[derive(Debug, Clone)]
pub struct UserService {
    /// User store.
    store: Arc<dyn UserStore>,
    /// Password hasher.
    hasher: Arc<PasswordHasher>,
    /// Password validator.
    validator: Arc<PasswordValidator>,
}

impl UserService {
    /// Creates a new user service.
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<PasswordHasher>,
        validator: Arc<PasswordValidator>,
    ) -> Self {
        Self {
            store,
            hasher,
            validator,
        }
    }

    /// Create an account.
    pub async fn register(&self, username: &str, password: &str) -> AppResult<User> {
        let username = username.trim();
        validate_username(username)?;
        self.validator.validate(username, password)?;

        let password_hash = self.hasher.hash_password(password)?;
        let user = self
            .store
            .create_user(&CreateUser {
                username: username.to_string(),
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Check credentials and return the account.
    ///
    /// Unknown users, deleted users and wrong passwords all produce the
    /// same error.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        let rejected = || AppError::authentication("Invalid username or password");

        let Some(user) = self.store.find_user_by_username(username.trim()).await? else {
            return Err(rejected());
        };
        if !user.can_login() {
            warn!(user_id = %user.id, "Login attempt for deleted user");
            return Err(rejected());
        }
        if !self.hasher.verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(rejected());
        }

        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Gets a user by id.
    pub async fn get_user(&self, id: UserId) -> AppResult<User> {
        self.store
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
    }

    /// Mark an account deleted. The username stays reserved.
    pub async fn delete_user(&self, id: UserId) -> AppResult<User> {
        let user = self.store.mark_user_deleted(id).await?;
        info!(user_id = %user.id, "User deleted");
        Ok(user)
    }
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::invalid_field("username", "username is required"));
    }
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(AppError::invalid_field(
            "username",
            format!(
                "username must be {} to {} characters",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            ),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AppError::invalid_field(
            "username",
            "username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(())
}
