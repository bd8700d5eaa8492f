pub mod article_service;
pub mod auth_service;
pub mod chat_service;
pub mod token_service;

pub use chat_service::ChatHub;
