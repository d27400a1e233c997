// src/services/auth.rs

use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, NewUser, ROLE_ADMIN, ROLE_USER, User},
    store::UserRepository,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new account with the `user` role.
pub async fn register<S>(store: &S, request: CreateUserRequest) -> Result<User, AppError>
where
    S: UserRepository + ?Sized,
{
    request.validate()?;

    let password_hash = hash_password(&request.password)?;
    let user = store
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
            role: ROLE_USER.to_string(),
        })
        .await?;

    tracing::info!("Registered user {} (id {})", user.username, user.id);
    Ok(user)
}

/// Checks credentials and returns a signed bearer token.
pub async fn login<S>(store: &S, config: &Config, request: LoginRequest) -> Result<String, AppError>
where
    S: UserRepository + ?Sized,
{
    request.validate()?;

    let user = store
        .find_user_by_username(&request.username)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&request.password, &user.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    sign_jwt(
        user.id,
        &user.username,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )
}

/// Creates the configured admin account unless it already exists.
pub async fn seed_admin_user<S>(store: &S, config: &Config) -> Result<(), AppError>
where
    S: UserRepository + ?Sized,
{
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if store.find_user_by_username(username).await?.is_some() {
        tracing::info!("Default admin user '{}' already exists. Skipping creation.", username);
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", username);
    let email = config
        .admin_email
        .clone()
        .unwrap_or_else(|| format!("{}@localhost", username));

    store
        .create_user(NewUser {
            username: username.clone(),
            email,
            password_hash: hash_password(password)?,
            role: ROLE_ADMIN.to_string(),
        })
        .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}
