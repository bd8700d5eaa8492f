use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::{AuthUser, Viewer};
use crate::models::{
    ArticleListParams, ArticleResponse, CreateArticleRequest, PaginatedArticles, PaginationParams,
    UpdateArticleRequest,
};
use crate::services::article_service;
use crate::state::AppState;
use crate::utils::validation::validate_id;

#[utoipa::path(
    get,
    path = "/api/articles",
    tag = "Articles",
    params(ArticleListParams),
    responses(
        (status = 200, description = "Published articles", body = PaginatedArticles),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn list_articles(
    state: web::Data<AppState>,
    viewer: Viewer,
    query: web::Query<ArticleListParams>,
) -> HttpResponse {
    log::info!("📰 GET /articles - viewer: {}", viewer.describe());

    match article_service::list_public(state.store(), &query, viewer.user()).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => {
            log::warn!("❌ Listing articles failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/articles/all",
    tag = "Articles",
    params(ArticleListParams),
    responses(
        (status = 200, description = "All articles including drafts", body = PaginatedArticles),
        (status = 400, description = "Invalid query parameters"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_all_articles(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ArticleListParams>,
) -> HttpResponse {
    log::info!("📰 GET /articles/all - admin: {}", user.email);

    match article_service::list_admin(state.store(), &query, &user).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => {
            log::warn!("❌ Admin listing failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/articles/user/saved",
    tag = "Articles",
    params(PaginationParams),
    responses(
        (status = 200, description = "Articles saved by the current user", body = PaginatedArticles),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn saved_articles(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PaginationParams>,
) -> HttpResponse {
    log::info!("🔖 GET /articles/user/saved - user: {}", user.email);

    match article_service::saved_articles(state.store(), &query, &user).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/articles/{id}",
    tag = "Articles",
    params(("id" = String, Path, description = "Article UUID")),
    responses(
        (status = 200, description = "Article", body = ArticleResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn get_article(state: web::Data<AppState>, viewer: Viewer, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    log::info!("📄 GET /articles/{} - viewer: {}", id, viewer.describe());

    if let Err(e) = validate_id(&id) {
        return e.error_response();
    }
    match article_service::get_article(state.store(), &id, viewer.user()).await {
        Ok(article) => HttpResponse::Ok().json(article),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/articles",
    tag = "Articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article created", body = ArticleResponse),
        (status = 400, description = "Invalid article data"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_article(
    state: web::Data<AppState>,
    user: AuthUser,
    request: web::Json<CreateArticleRequest>,
) -> HttpResponse {
    log::info!("📝 POST /articles - admin: {}", user.email);

    match article_service::create_article(state.store(), &request).await {
        Ok(article) => HttpResponse::Created().json(article),
        Err(e) => {
            log::warn!("❌ Article creation failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/articles/{id}",
    tag = "Articles",
    params(("id" = String, Path, description = "Article UUID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Article updated", body = ArticleResponse),
        (status = 400, description = "Invalid article data"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Article not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_article(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
    request: web::Json<UpdateArticleRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    log::info!("✏️  PATCH /articles/{} - admin: {}", id, user.email);

    if let Err(e) = validate_id(&id) {
        return e.error_response();
    }
    match article_service::update_article(state.store(), &id, &request, &user).await {
        Ok(article) => HttpResponse::Ok().json(article),
        Err(e) => {
            log::warn!("❌ Article update failed: {} - {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    tag = "Articles",
    params(("id" = String, Path, description = "Article UUID")),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Article not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_article(state: web::Data<AppState>, user: AuthUser, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    log::info!("🗑️  DELETE /articles/{} - admin: {}", id, user.email);

    if let Err(e) = validate_id(&id) {
        return e.error_response();
    }
    match article_service::delete_article(state.store(), &id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => {
            log::warn!("❌ Article deletion failed: {} - {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/articles/{id}/like",
    tag = "Articles",
    params(("id" = String, Path, description = "Article UUID")),
    responses(
        (status = 200, description = "Like toggled", body = ArticleResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Article not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_like(state: web::Data<AppState>, user: AuthUser, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    log::info!("👍 POST /articles/{}/like - user: {}", id, user.email);

    if let Err(e) = validate_id(&id) {
        return e.error_response();
    }
    match article_service::toggle_like(state.store(), &state.locks, &id, &user).await {
        Ok(article) => HttpResponse::Ok().json(article),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/articles/{id}/save",
    tag = "Articles",
    params(("id" = String, Path, description = "Article UUID")),
    responses(
        (status = 200, description = "Save toggled", body = ArticleResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Article not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn toggle_save(state: web::Data<AppState>, user: AuthUser, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    log::info!("🔖 POST /articles/{}/save - user: {}", id, user.email);

    if let Err(e) = validate_id(&id) {
        return e.error_response();
    }
    match article_service::toggle_save(state.store(), &state.locks, &id, &user).await {
        Ok(article) => HttpResponse::Ok().json(article),
        Err(e) => e.error_response(),
    }
}
