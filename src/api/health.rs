use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::models::{format_timestamp, now_millis};
use crate::state::AppState;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub storage: String,
    pub chat_clients: usize,
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Storage is unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_ok = match state.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("⚠️  Health check: storage ping failed: {}", e);
            false
        }
    };

    let body = HealthResponse {
        status: if store_ok { "healthy" } else { "degraded" }.to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.store().backend_name().to_string(),
        chat_clients: state.chat.connected_clients(),
        timestamp: format_timestamp(now_millis()),
    };

    if store_ok {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
