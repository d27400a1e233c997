// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique email address.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Data needed to persist a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// The authenticated caller, passed explicitly into every core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(email(message = "Incorrect email format."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 100,
        message = "Password length must be between 8 and 100 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 100))]
    pub password: String,
}
