pub mod articles;
pub mod auth;
pub mod chat;
pub mod health;
pub mod swagger;

use actix_web::{http::Method, web};

use crate::middleware::{Access, AccessPolicy};
use crate::utils::AppError;

/// Malformed query strings, bodies and paths answer 400 with the common error body
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(256 * 1024)
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, _| AppError::Validation(err.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|err, _| AppError::Validation(err.to_string()).into()));
}

/// Registers every route; `prefix` is the API prefix (e.g. `/api`), `/health` stays at the root
pub fn configure(cfg: &mut web::ServiceConfig, prefix: &str) {
    extractor_configs(cfg);

    cfg.route("/health", web::get().to(health::health_check)).service(
        web::scope(prefix)
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/register")
                            .wrap(AccessPolicy::new().allow(Method::POST, Access::Public))
                            .route(web::post().to(auth::register)),
                    )
                    .service(
                        web::resource("/login")
                            .wrap(AccessPolicy::new().allow(Method::POST, Access::Public))
                            .route(web::post().to(auth::login)),
                    )
                    .service(
                        web::resource("/profile")
                            .wrap(
                                AccessPolicy::new()
                                    .allow(Method::GET, Access::Authenticated)
                                    .allow(Method::PATCH, Access::Authenticated),
                            )
                            .route(web::get().to(auth::get_profile))
                            .route(web::patch().to(auth::update_profile)),
                    )
                    .service(
                        web::resource("/profile/change-password")
                            .wrap(AccessPolicy::new().allow(Method::POST, Access::Authenticated))
                            .route(web::post().to(auth::change_password)),
                    ),
            )
            .service(
                web::scope("/articles")
                    .service(
                        web::resource("")
                            .wrap(
                                AccessPolicy::new()
                                    .allow(Method::GET, Access::Public)
                                    .allow(Method::POST, Access::admin()),
                            )
                            .route(web::get().to(articles::list_articles))
                            .route(web::post().to(articles::create_article)),
                    )
                    .service(
                        web::resource("/all")
                            .wrap(AccessPolicy::new().allow(Method::GET, Access::admin()))
                            .route(web::get().to(articles::list_all_articles)),
                    )
                    .service(
                        web::resource("/user/saved")
                            .wrap(AccessPolicy::new().allow(Method::GET, Access::Authenticated))
                            .route(web::get().to(articles::saved_articles)),
                    )
                    .service(
                        web::resource("/{id}")
                            .wrap(
                                AccessPolicy::new()
                                    .allow(Method::GET, Access::Public)
                                    .allow(Method::PATCH, Access::admin())
                                    .allow(Method::DELETE, Access::admin()),
                            )
                            .route(web::get().to(articles::get_article))
                            .route(web::patch().to(articles::update_article))
                            .route(web::delete().to(articles::delete_article)),
                    )
                    .service(
                        web::resource("/{id}/like")
                            .wrap(AccessPolicy::new().allow(Method::POST, Access::Authenticated))
                            .route(web::post().to(articles::toggle_like)),
                    )
                    .service(
                        web::resource("/{id}/save")
                            .wrap(AccessPolicy::new().allow(Method::POST, Access::Authenticated))
                            .route(web::post().to(articles::toggle_save)),
                    ),
            )
            .service(
                web::resource("/chat")
                    .wrap(AccessPolicy::new().allow(Method::GET, Access::Authenticated))
                    .route(web::get().to(chat::chat_socket)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{Datastore, MemoryStore};
    use crate::models::Role;
    use crate::services::{auth_service::create_user, token_service};
    use crate::state::AppState;
    use actix_web::{
        dev::ServiceResponse,
        http::{header, StatusCode},
        test, App,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn app_state() -> web::Data<AppState> {
        let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
        let config = AppConfig::for_tests();
        create_user(store.as_ref(), &config, "admin@example.com", "Password123!", "Admin", "User", Role::Admin)
            .await
            .unwrap();
        web::Data::new(AppState::new(store, config))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .configure(|cfg| configure(cfg, "/api")),
            )
            .await
        };
    }

    async fn json_body(resp: ServiceResponse) -> Value {
        let body = test::read_body(resp).await;
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    }

    async fn token_for(state: &web::Data<AppState>, email: &str) -> String {
        let user = state.store().find_user_by_email(email).await.unwrap().unwrap();
        token_service::issue_token(&state.config, &user).unwrap()
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_register_and_profile() {
        let state = app_state().await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "email": "alice@example.com",
                "password": "Password123!",
                "firstName": "Alice",
                "lastName": "Smith"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["user"]["role"], "user");
        assert!(body["user"].get("passwordHash").is_none());
        let token = body["accessToken"].as_str().unwrap().to_string();

        let req = test::TestRequest::get().uri("/api/auth/profile").insert_header(bearer(&token)).to_request();
        let profile: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(profile["email"], "alice@example.com");
        assert_eq!(profile["firstName"], "Alice");

        // duplicate email
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "email": "alice@example.com",
                "password": "Password123!",
                "firstName": "Alice",
                "lastName": "Again"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(resp).await["statusCode"], 409);
    }

    #[actix_web::test]
    async fn test_profile_requires_token() {
        let state = app_state().await;
        let app = app!(state);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/auth/profile").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["success"], false);
    }

    #[actix_web::test]
    async fn test_malformed_body_is_bad_request() {
        let state = app_state().await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_article_lifecycle() {
        let state = app_state().await;
        let app = app!(state);
        let admin = token_for(&state, "admin@example.com").await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "email": "reader@example.com",
                "password": "Password123!",
                "firstName": "Re",
                "lastName": "Ader"
            }))
            .to_request();
        let registered: Value = test::call_and_read_body_json(&app, req).await;
        let reader = registered["accessToken"].as_str().unwrap().to_string();

        // readers cannot create
        let article = json!({
            "title": "Rust in production",
            "body": "Ownership all the way down.",
            "category": "tech",
            "tags": ["rust", "backend"]
        });
        let req = test::TestRequest::post()
            .uri("/api/articles")
            .insert_header(bearer(&reader))
            .set_json(&article)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(resp).await["message"],
            "You do not have the necessary permissions. Required role(s): admin."
        );

        let req = test::TestRequest::post()
            .uri("/api/articles")
            .insert_header(bearer(&admin))
            .set_json(&article)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json_body(resp).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["isPublished"], true);
        assert_eq!(created["likes"], 0);

        // like, then like again
        let like_uri = format!("/api/articles/{}/like", id);
        let req = test::TestRequest::post().uri(&like_uri).insert_header(bearer(&reader)).to_request();
        let liked: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(liked["likes"], 1);
        assert_eq!(liked["currentUserHasLiked"], true);

        let req = test::TestRequest::get()
            .uri(&format!("/api/articles/{}", id))
            .insert_header(bearer(&reader))
            .to_request();
        let seen: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(seen["currentUserHasLiked"], true);

        let req = test::TestRequest::get().uri(&format!("/api/articles/{}", id)).to_request();
        let anonymous: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(anonymous["currentUserHasLiked"], false);

        let req = test::TestRequest::post().uri(&like_uri).insert_header(bearer(&reader)).to_request();
        let unliked: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(unliked["likes"], 0);
        assert_eq!(unliked["currentUserHasLiked"], false);

        // save shows up in the saved list
        let req = test::TestRequest::post()
            .uri(&format!("/api/articles/{}/save", id))
            .insert_header(bearer(&reader))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::get().uri("/api/articles/user/saved").insert_header(bearer(&reader)).to_request();
        let saved: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(saved["total"], 1);
        assert_eq!(saved["data"][0]["id"], id.as_str());

        // delete
        let req = test::TestRequest::delete()
            .uri(&format!("/api/articles/{}", id))
            .insert_header(bearer(&admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        let req = test::TestRequest::get().uri(&format!("/api/articles/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_listing_queries() {
        let state = app_state().await;
        let app = app!(state);
        let admin = token_for(&state, "admin@example.com").await;

        for (title, published) in [("Zeta draft", false), ("Alpha", true), ("Mu draft", false), ("Beta", true)] {
            let req = test::TestRequest::post()
                .uri("/api/articles")
                .insert_header(bearer(&admin))
                .set_json(json!({
                    "title": title,
                    "body": "body",
                    "category": "news",
                    "tags": ["daily"],
                    "isPublished": published
                }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/api/articles?limit=10").to_request();
        let public: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(public["total"], 2);
        assert_eq!(public["totalPages"], 1);

        let req = test::TestRequest::get()
            .uri("/api/articles/all?publishedStatus=false&sortBy=title&sortDirection=ASC")
            .insert_header(bearer(&admin))
            .to_request();
        let drafts: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(drafts["data"][0]["title"], "Mu draft");
        assert_eq!(drafts["data"][1]["title"], "Zeta draft");

        // anonymous callers cannot reach the admin listing
        let req = test::TestRequest::get().uri("/api/articles/all").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get().uri("/api/articles?limit=500").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/articles?page=abc").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/articles/not-a-uuid").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health() {
        let state = app_state().await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["chatClients"], 0);
    }

    #[actix_web::test]
    async fn test_chat_requires_token() {
        let state = app_state().await;
        let app = app!(state);

        let upgrade = |uri: &str| {
            test::TestRequest::get()
                .uri(uri)
                .insert_header((header::UPGRADE, "websocket"))
                .insert_header((header::CONNECTION, "upgrade"))
                .insert_header((header::SEC_WEBSOCKET_VERSION, "13"))
                .insert_header((header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ=="))
                .to_request()
        };

        let resp = test::call_service(&app, upgrade("/api/chat")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(&app, upgrade("/api/chat?token=not.a.token")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.chat.connected_clients(), 0);
    }

    async fn next_event<S>(conn: &mut S) -> Value
    where
        S: futures::Stream<Item = Result<awc::ws::Frame, awc::error::WsProtocolError>> + Unpin,
    {
        use futures::StreamExt;
        loop {
            let frame = tokio::time::timeout(std::time::Duration::from_secs(5), conn.next())
                .await
                .expect("timed out waiting for a chat frame")
                .expect("socket closed")
                .expect("protocol error");
            if let awc::ws::Frame::Text(bytes) = frame {
                return serde_json::from_slice(&bytes).unwrap();
            }
        }
    }

    #[actix_web::test]
    async fn test_chat_relays_between_clients() {
        use futures::SinkExt;

        let state = app_state().await;
        let config = state.config.clone();
        let alice = create_user(state.store(), &config, "alice@example.com", "Password123!", "Alice", "Smith", Role::User)
            .await
            .unwrap();
        let bob = create_user(state.store(), &config, "bob@example.com", "Password123!", "Bob", "Johnson", Role::User)
            .await
            .unwrap();
        let alice_token = token_service::issue_token(&config, &alice).unwrap();
        let bob_token = token_service::issue_token(&config, &bob).unwrap();

        let server_state = state.clone();
        let mut srv = actix_test::start(move || {
            App::new()
                .app_data(server_state.clone())
                .configure(|cfg| configure(cfg, "/api"))
        });

        let mut alice_ws = srv.ws_at(&format!("/api/chat?token={}", alice_token)).await.unwrap();
        let mut bob_ws = srv.ws_at(&format!("/api/chat?token={}", bob_token)).await.unwrap();

        let hello = next_event(&mut alice_ws).await;
        assert_eq!(hello["event"], "connectionStatus");
        assert_eq!(hello["data"]["status"], "connected");
        assert_eq!(hello["data"]["userId"], alice.id.as_str());
        assert_eq!(next_event(&mut bob_ws).await["data"]["userId"], bob.id.as_str());

        alice_ws
            .send(awc::ws::Message::Text(
                json!({"event": "sendMessage", "data": {"message": "  hi bob  "}}).to_string().into(),
            ))
            .await
            .unwrap();

        for conn in [&mut alice_ws, &mut bob_ws] {
            let event = next_event(conn).await;
            assert_eq!(event["event"], "newMessage");
            assert_eq!(event["data"]["message"], "hi bob");
            assert_eq!(event["data"]["senderId"], alice.id.as_str());
            assert_eq!(event["data"]["senderName"], "Alice Smith");
            assert_eq!(event["data"]["room"], "general-chat");
        }

        // errors go to the sender only
        bob_ws
            .send(awc::ws::Message::Text(
                json!({"event": "sendMessage", "data": {"message": "x".repeat(1001)}}).to_string().into(),
            ))
            .await
            .unwrap();
        assert_eq!(next_event(&mut bob_ws).await["event"], "error");

        bob_ws
            .send(awc::ws::Message::Text(json!({"event": "joinRoom", "data": {"room": "other"}}).to_string().into()))
            .await
            .unwrap();
        let ack = next_event(&mut bob_ws).await;
        assert_eq!(ack["event"], "joinedRoomAck");
        assert_eq!(ack["data"]["room"], "general-chat");

        alice_ws
            .send(awc::ws::Message::Text(json!({"event": "sendMessage", "data": "second"}).to_string().into()))
            .await
            .unwrap();
        assert_eq!(next_event(&mut alice_ws).await["data"]["message"], "second");
        let at_bob = next_event(&mut bob_ws).await;
        assert_eq!(at_bob["event"], "newMessage");
        assert_eq!(at_bob["data"]["message"], "second");
    }
}
