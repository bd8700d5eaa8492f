use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Article Platform API",
        version = "1.0.0",
        description = "Article publishing backend.\n\n**Authentication:** protected endpoints take a JWT Bearer token from `/api/auth/login` or `/api/auth/register`.\n\n**Roles:** `admin` manages articles and sees drafts; `user` reads published articles, likes and saves them, and chats."
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::get_profile,
        crate::api::auth::update_profile,
        crate::api::auth::change_password,

        // Articles
        crate::api::articles::list_articles,
        crate::api::articles::list_all_articles,
        crate::api::articles::saved_articles,
        crate::api::articles::get_article,
        crate::api::articles::create_article,
        crate::api::articles::update_article,
        crate::api::articles::delete_article,
        crate::api::articles::toggle_like,
        crate::api::articles::toggle_save,

        // Chat
        crate::api::chat::chat_socket,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::models::Role,
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::UpdateProfileRequest,
            crate::models::ChangePasswordRequest,
            crate::models::UserResponse,
            crate::models::AuthResponse,
            crate::models::MessageResponse,
            crate::models::ArticleCategory,
            crate::models::CreateArticleRequest,
            crate::models::UpdateArticleRequest,
            crate::models::ArticleResponse,
            crate::models::PaginatedArticles,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and profile management."),
        (name = "Articles", description = "Article listing, administration, likes and bookmarks."),
        (name = "Chat", description = "WebSocket chat relay. Frames are JSON `{event, data}`; send `sendMessage`, receive `newMessage`."),
        (name = "Health", description = "Liveness and storage status."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from login or register"))
                        .build(),
                ),
            );
        }
    }
}
