// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Quiz title length bounds.
pub const QUIZ_TITLE_MIN_LEN: u64 = 3;
pub const QUIZ_TITLE_MAX_LEN: u64 = 255;
pub const QUIZ_DESCRIPTION_MAX_LEN: u64 = 1000;

/// Question prompt length bounds.
pub const QUESTION_TEXT_MAX_LEN: u64 = 1000;

/// Upper bound for a single choice text or match pair item.
pub const ITEM_MAX_LEN: usize = 500;

/// Minimum number of choices a multiple-choice question must carry.
pub const MIN_CHOICES: usize = 2;

const DEFAULT_JWT_EXPIRATION: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` selects the in-process store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub admin_username: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}
