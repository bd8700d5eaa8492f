use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::Datastore;
use crate::models::{
    now_millis, AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, ProfileChanges,
    RegisterRequest, Role, UpdateProfileRequest, User, UserResponse,
};
use crate::services::token_service;
use crate::utils::validation::{validate_email, validate_password, validate_text, NAME_MAX};
use crate::utils::AppError;

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Hash checked when the email is unknown, so both login failures cost one bcrypt verify
static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

async fn dummy_hash(cost: u32) -> Result<&'static str, AppError> {
    DUMMY_HASH
        .get_or_try_init(|| hash_password("unknown-account-placeholder", cost))
        .await
        .map(String::as_str)
}

async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal("Password hashing was interrupted", e))?
        .map_err(|e| AppError::internal("Could not hash password", e))
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let (password, hash) = (password.to_string(), hash.to_string());
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::internal("Password verification was interrupted", e))?
        .map_err(|e| AppError::internal("Could not verify password", e))
}

/// Hashes the password and stores a new user; duplicate emails yield `Conflict`
pub async fn create_user(
    store: &dyn Datastore,
    config: &AppConfig,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    role: Role,
) -> Result<User, AppError> {
    if store.find_user_by_email(email).await?.is_some() {
        return Err(AppError::Conflict(format!("User with email \"{}\" already exists.", email)));
    }

    let now = now_millis();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        password_hash: hash_password(password, config.bcrypt_cost).await?,
        role,
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        created_at: now,
        updated_at: now,
    };

    // The unique index still catches a concurrent registration
    store.insert_user(&user).await?;
    Ok(user)
}

// User registration
pub async fn register(
    store: &dyn Datastore,
    config: &AppConfig,
    request: &RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let email = request.email.trim();
    validate_email(email)?;
    validate_password("Password", &request.password)?;
    validate_text("First name", &request.first_name, NAME_MAX)?;
    validate_text("Last name", &request.last_name, NAME_MAX)?;

    let role = request.role.unwrap_or_default();
    if role == Role::Admin && !config.allow_admin_registration {
        log::warn!("❌ Refused self-registration as admin: {}", email);
        return Err(AppError::Forbidden("Registering as admin is not allowed.".into()));
    }

    let user = create_user(
        store,
        config,
        email,
        &request.password,
        &request.first_name,
        &request.last_name,
        role,
    )
    .await?;

    let access_token = token_service::issue_token(config, &user)?;
    log::info!("✅ User registered successfully: {} ({})", user.email, user.role);

    Ok(AuthResponse {
        access_token,
        user: user.into(),
    })
}

// User login
pub async fn login(
    store: &dyn Datastore,
    config: &AppConfig,
    request: &LoginRequest,
) -> Result<AuthResponse, AppError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::Validation("Email and password are required.".into()));
    }

    // Same answer, and the same bcrypt work, for unknown email and wrong password
    let Some(user) = store.find_user_by_email(request.email.trim()).await? else {
        verify_password(&request.password, dummy_hash(config.bcrypt_cost).await?).await?;
        log::warn!("❌ Failed login attempt for unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(&request.password, &user.password_hash).await? {
        log::warn!("❌ Failed login attempt for {}", user.email);
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let access_token = token_service::issue_token(config, &user)?;
    log::info!("✅ User logged in: {}", user.email);

    Ok(AuthResponse {
        access_token,
        user: user.into(),
    })
}

/// Resolves a bearer token to the current user record.
///
/// Claims only identify the user; role and names always come from storage,
/// so a deleted user is rejected even while the token is still unexpired.
pub async fn authenticate(store: &dyn Datastore, config: &AppConfig, token: &str) -> Result<User, AppError> {
    let claims = token_service::verify_token(config, token)?;
    store
        .find_user_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User from token not found or invalid.".into()))
}

// Get current user
pub async fn get_profile(store: &dyn Datastore, user_id: &str) -> Result<UserResponse, AppError> {
    store
        .find_user_by_id(user_id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::NotFound(format!("User with ID \"{}\" not found.", user_id)))
}

pub async fn update_profile(
    store: &dyn Datastore,
    user_id: &str,
    request: &UpdateProfileRequest,
) -> Result<UserResponse, AppError> {
    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with ID \"{}\" not found.", user_id)))?;

    let mut changes = ProfileChanges::default();
    if let Some(first_name) = &request.first_name {
        validate_text("First name", first_name, NAME_MAX)?;
        let first_name = first_name.trim();
        if first_name != user.first_name {
            changes.first_name = Some(first_name.to_string());
        }
    }
    if let Some(last_name) = &request.last_name {
        validate_text("Last name", last_name, NAME_MAX)?;
        let last_name = last_name.trim();
        if last_name != user.last_name {
            changes.last_name = Some(last_name.to_string());
        }
    }
    if let Some(email) = &request.email {
        let email = email.trim();
        validate_email(email)?;
        if email != user.email {
            if let Some(other) = store.find_user_by_email(email).await? {
                if other.id != user.id {
                    return Err(AppError::Conflict(format!(
                        "Email \"{}\" is already in use by another account.",
                        email
                    )));
                }
            }
            changes.email = Some(email.to_string());
        }
    }

    if changes.is_empty() {
        log::debug!("Profile update for {} changed nothing", user.email);
        return Ok(user.into());
    }

    let updated = store
        .update_profile(user_id, &changes, now_millis())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with ID \"{}\" not found.", user_id)))?;

    log::info!("✅ Profile updated: {}", updated.email);
    Ok(updated.into())
}

pub async fn change_password(
    store: &dyn Datastore,
    config: &AppConfig,
    user_id: &str,
    request: &ChangePasswordRequest,
) -> Result<MessageResponse, AppError> {
    if request.current_password.is_empty() {
        return Err(AppError::Validation("Current password should not be empty.".into()));
    }
    validate_password("New password", &request.new_password)?;

    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with ID \"{}\" not found.", user_id)))?;

    if !verify_password(&request.current_password, &user.password_hash).await? {
        return Err(AppError::Unauthorized("Incorrect current password.".into()));
    }
    if verify_password(&request.new_password, &user.password_hash).await? {
        return Err(AppError::Validation(
            "New password cannot be the same as the old password.".into(),
        ));
    }

    let password_hash = hash_password(&request.new_password, config.bcrypt_cost).await?;
    if !store.update_password(user_id, &password_hash, now_millis()).await? {
        return Err(AppError::NotFound(format!("User with ID \"{}\" not found.", user_id)));
    }

    log::info!("✅ Password changed for {}", user.email);
    Ok(MessageResponse {
        message: "Password changed successfully.".into(),
    })
}
