pub mod articles_seed;
pub mod users_seed;

use crate::config::AppConfig;
use crate::database::Datastore;

/// Startup seeding; every step is idempotent and failures are only logged
pub async fn run(store: &dyn Datastore, config: &AppConfig) {
    log::info!("🌱 Seeding demo data...");
    let users = users_seed::seed_default_users(store, config).await;
    let articles = articles_seed::seed_demo_articles(store).await;
    log::info!("✅ Seeding finished: {} user(s), {} article(s) created", users, articles);
}
