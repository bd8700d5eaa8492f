use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::AuthUser;
use crate::models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest, UpdateProfileRequest,
    UserResponse,
};
use crate::services::auth_service;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 403, description = "Admin self-registration is disabled"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(state: web::Data<AppState>, request: web::Json<RegisterRequest>) -> HttpResponse {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(state.store(), &state.config, &request).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(state: web::Data<AppState>, request: web::Json<LoginRequest>) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(state.store(), &state.config, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(state: web::Data<AppState>, user: AuthUser) -> HttpResponse {
    log::info!("👤 GET /auth/profile - user: {}", user.email);

    match auth_service::get_profile(state.store(), &user.id).await {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/api/auth/profile",
    tag = "Auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid profile data"),
        (status = 401, description = "Missing or invalid token"),
        (status = 409, description = "Email already in use")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    state: web::Data<AppState>,
    user: AuthUser,
    request: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    log::info!("✏️  PATCH /auth/profile - user: {}", user.email);

    match auth_service::update_profile(state.store(), &user.id, &request).await {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(e) => {
            log::warn!("❌ Profile update failed: {} - {}", user.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/profile/change-password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid new password"),
        (status = 401, description = "Incorrect current password")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    state: web::Data<AppState>,
    user: AuthUser,
    request: web::Json<ChangePasswordRequest>,
) -> HttpResponse {
    log::info!("🔑 POST /auth/profile/change-password - user: {}", user.email);

    match auth_service::change_password(state.store(), &state.config, &user.id, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("❌ Password change failed: {} - {}", user.email, e);
            e.error_response()
        }
    }
}
