mod api;
mod config;
mod database;
mod middleware;
mod models;
mod seeds;
mod services;
mod state;
mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Compress, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::database::{Datastore, MemoryStore, MongoDB};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting Article Platform...");

    let store: Arc<dyn Datastore> = match &config.database_url {
        Some(url) => match MongoDB::new(url).await {
            Ok(db) => {
                log::info!("✅ MongoDB connected successfully");
                Arc::new(db)
            }
            Err(e) => {
                log::error!("❌ Failed to connect to MongoDB: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            log::warn!("⚠️  DATABASE_URL not set, using the in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    if config.seed_data {
        seeds::run(store.as_ref(), &config).await;
    }

    let host = config.host.clone();
    let port = config.port;
    let prefix = config.api_prefix.clone();
    let frontend_url = config.frontend_url.clone();
    let state = web::Data::new(AppState::new(store, config));

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}{}/docs/", host, port, prefix);
    log::info!("💬 Chat WebSocket at: ws://{}:{}{}/chat", host, port, prefix);

    let openapi = api::swagger::ApiDoc::openapi();

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers(vec![header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let prefix = prefix.clone();
        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new(format!("{}/docs/{{_:.*}}", prefix))
                    .url(format!("{}/docs/openapi.json", prefix), openapi.clone()),
            )
            .configure(move |cfg| api::configure(cfg, &prefix))
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
