use crate::config::AppConfig;
use crate::database::Datastore;
use crate::models::Role;
use crate::services::auth_service;
use crate::utils::AppError;

const DEMO_PASSWORD: &str = "Password123!";

/// Ensures the configured admin and two demo readers exist. Returns how many were created.
pub async fn seed_default_users(store: &dyn Datastore, config: &AppConfig) -> usize {
    let accounts = [
        (config.admin_email.as_str(), config.admin_password.as_str(), "Admin", "Root", Role::Admin),
        ("user1@example.com", DEMO_PASSWORD, "Alice", "Smith", Role::User),
        ("user2@example.com", DEMO_PASSWORD, "Bob", "Johnson", Role::User),
    ];

    let mut created = 0;
    for (email, password, first_name, last_name, role) in accounts {
        match auth_service::create_user(store, config, email, password, first_name, last_name, role).await {
            Ok(user) => {
                created += 1;
                log::info!("   ✅ User {} created ({})", user.email, user.role);
            }
            Err(AppError::Conflict(_)) => log::info!("   ℹ️  User {} already exists, skipping", email),
            Err(e) => log::error!("   ❌ Failed to seed user {}: {}", email, e),
        }
    }
    created
}
