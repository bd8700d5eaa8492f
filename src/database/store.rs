use async_trait::async_trait;

use crate::models::{Article, ArticleChanges, ArticleQuery, Engagement, Pagination, ProfileChanges, User};
use crate::utils::AppError;

/// Credential store: owns user records
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Exact, case-sensitive match
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the email is already registered
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Returns the refreshed user, or `None` if it no longer exists
    async fn update_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
        updated_at: i64,
    ) -> Result<Option<User>, AppError>;

    async fn update_password(&self, id: &str, password_hash: &str, updated_at: i64) -> Result<bool, AppError>;
}

/// Article repository: CRUD plus filtered, paginated queries
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert_article(&self, article: &Article) -> Result<(), AppError>;

    async fn find_article(&self, id: &str) -> Result<Option<Article>, AppError>;

    /// One page of matching articles plus the total match count
    async fn query_articles(&self, query: &ArticleQuery) -> Result<(Vec<Article>, u64), AppError>;

    async fn update_article(&self, id: &str, changes: &ArticleChanges, updated_at: i64) -> Result<Option<Article>, AppError>;

    /// Hard delete; like and save records of the article go with it
    async fn delete_article(&self, id: &str) -> Result<bool, AppError>;

    /// Atomically adds `delta` to the like counter, never going below zero
    async fn adjust_likes(&self, id: &str, delta: i64) -> Result<(), AppError>;

    async fn count_articles(&self) -> Result<u64, AppError>;
}

/// Engagement ledger: like and save relations, unique per (user, article)
#[async_trait]
pub trait EngagementStore: Send + Sync {
    async fn has_engagement(&self, kind: Engagement, user_id: &str, article_id: &str) -> Result<bool, AppError>;

    /// `false` when the record already existed
    async fn insert_engagement(&self, kind: Engagement, user_id: &str, article_id: &str, at: i64) -> Result<bool, AppError>;

    /// `false` when there was nothing to remove
    async fn remove_engagement(&self, kind: Engagement, user_id: &str, article_id: &str) -> Result<bool, AppError>;

    /// Article ids engaged by the user, newest first, plus the total count
    async fn engaged_article_ids(
        &self,
        kind: Engagement,
        user_id: &str,
        pagination: Pagination,
    ) -> Result<(Vec<String>, u64), AppError>;

    async fn count_engagements(&self, kind: Engagement, article_id: &str) -> Result<u64, AppError>;
}

/// Everything the services need from a backend
#[async_trait]
pub trait Datastore: UserStore + ArticleStore + EngagementStore {
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), AppError>;
}
