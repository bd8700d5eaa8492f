use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::store::{ArticleStore, Datastore, EngagementStore, UserStore};
use crate::models::{Article, ArticleChanges, ArticleQuery, Engagement, Pagination, ProfileChanges, User};
use crate::utils::AppError;

type EngagementKey = (String, String);

#[derive(Default)]
struct MemoryData {
    users: HashMap<String, User>,
    articles: HashMap<String, Article>,
    likes: HashMap<EngagementKey, i64>,
    saves: HashMap<EngagementKey, i64>,
}

impl MemoryData {
    fn ledger(&self, kind: Engagement) -> &HashMap<EngagementKey, i64> {
        match kind {
            Engagement::Like => &self.likes,
            Engagement::Save => &self.saves,
        }
    }

    fn ledger_mut(&mut self, kind: Engagement) -> &mut HashMap<EngagementKey, i64> {
        match kind {
            Engagement::Like => &mut self.likes,
            Engagement::Save => &mut self.saves,
        }
    }
}

/// In-process store, used when no DATABASE_URL is configured and by the tests.
/// Every operation runs under one lock, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn key(user_id: &str, article_id: &str) -> EngagementKey {
    (user_id.to_string(), article_id.to_string())
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.read().users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.read().users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut data = self.write();
        if data.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(format!(
                "User with email \"{}\" already exists.",
                user.email
            )));
        }
        data.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
        updated_at: i64,
    ) -> Result<Option<User>, AppError> {
        let mut data = self.write();
        if let Some(email) = &changes.email {
            if data.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::Conflict(format!("Email \"{}\" is already in use.", email)));
            }
        }

        let Some(user) = data.users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(first_name) = &changes.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &changes.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        user.updated_at = updated_at;
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: &str, password_hash: &str, updated_at: i64) -> Result<bool, AppError> {
        let mut data = self.write();
        match data.users.get_mut(id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_article(&self, article: &Article) -> Result<(), AppError> {
        let mut data = self.write();
        if data.articles.contains_key(&article.id) {
            return Err(AppError::Conflict("Article already exists.".into()));
        }
        data.articles.insert(article.id.clone(), article.clone());
        Ok(())
    }

    async fn find_article(&self, id: &str) -> Result<Option<Article>, AppError> {
        Ok(self.read().articles.get(id).cloned())
    }

    async fn query_articles(&self, query: &ArticleQuery) -> Result<(Vec<Article>, u64), AppError> {
        let data = self.read();
        let mut matching: Vec<&Article> = data.articles.values().filter(|a| query.matches(a)).collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.pagination.skip() as usize)
            .take(query.pagination.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update_article(&self, id: &str, changes: &ArticleChanges, updated_at: i64) -> Result<Option<Article>, AppError> {
        let mut data = self.write();
        Ok(data.articles.get_mut(id).map(|article| {
            changes.apply(article, updated_at);
            article.clone()
        }))
    }

    async fn delete_article(&self, id: &str) -> Result<bool, AppError> {
        let mut data = self.write();
        if data.articles.remove(id).is_none() {
            return Ok(false);
        }
        data.likes.retain(|(_, article_id), _| article_id != id);
        data.saves.retain(|(_, article_id), _| article_id != id);
        Ok(true)
    }

    async fn adjust_likes(&self, id: &str, delta: i64) -> Result<(), AppError> {
        let mut data = self.write();
        if let Some(article) = data.articles.get_mut(id) {
            article.likes = (article.likes + delta).max(0);
        }
        Ok(())
    }

    async fn count_articles(&self) -> Result<u64, AppError> {
        Ok(self.read().articles.len() as u64)
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn has_engagement(&self, kind: Engagement, user_id: &str, article_id: &str) -> Result<bool, AppError> {
        Ok(self.read().ledger(kind).contains_key(&key(user_id, article_id)))
    }

    async fn insert_engagement(&self, kind: Engagement, user_id: &str, article_id: &str, at: i64) -> Result<bool, AppError> {
        let mut data = self.write();
        if !data.articles.contains_key(article_id) {
            return Err(AppError::NotFound(format!("Article with ID \"{}\" not found.", article_id)));
        }
        let ledger = data.ledger_mut(kind);
        let key = key(user_id, article_id);
        if ledger.contains_key(&key) {
            return Ok(false);
        }
        ledger.insert(key, at);
        Ok(true)
    }

    async fn remove_engagement(&self, kind: Engagement, user_id: &str, article_id: &str) -> Result<bool, AppError> {
        Ok(self.write().ledger_mut(kind).remove(&key(user_id, article_id)).is_some())
    }

    async fn engaged_article_ids(
        &self,
        kind: Engagement,
        user_id: &str,
        pagination: Pagination,
    ) -> Result<(Vec<String>, u64), AppError> {
        let data = self.read();
        let mut entries: Vec<(&String, i64)> = data
            .ledger(kind)
            .iter()
            .filter(|((uid, _), _)| uid == user_id)
            .map(|((_, article_id), at)| (article_id, *at))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let total = entries.len() as u64;
        let ids = entries
            .into_iter()
            .skip(pagination.skip() as usize)
            .take(pagination.limit as usize)
            .map(|(article_id, _)| article_id.clone())
            .collect();
        Ok((ids, total))
    }

    async fn count_engagements(&self, kind: Engagement, article_id: &str) -> Result<u64, AppError> {
        Ok(self
            .read()
            .ledger(kind)
            .keys()
            .filter(|(_, aid)| aid == article_id)
            .count() as u64)
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleCategory, ArticleListParams, Audience, Role};

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: Role::User,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            created_at: 1,
            updated_at: 1,
        }
    }

    fn article(id: &str, created_at: i64, published: bool) -> Article {
        Article {
            id: id.into(),
            title: format!("Article {}", id),
            body: "body".into(),
            image_url: None,
            category: ArticleCategory::General,
            tags: vec!["misc".into()],
            likes: 0,
            is_published: published,
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(&user("u1", "a@example.com")).await.unwrap();
        let err = store.insert_user(&user("u2", "a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // case-sensitive as stored
        store.insert_user(&user("u3", "A@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_paginates_and_counts() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store.insert_article(&article(&format!("a{:02}", i), i, i % 5 != 0)).await.unwrap();
        }

        let params = ArticleListParams {
            page: Some(2),
            limit: Some(8),
            ..Default::default()
        };
        let query = ArticleQuery::from_params(&params, Audience::Public).unwrap();
        let (page, total) = store.query_articles(&query).await.unwrap();

        assert_eq!(total, 20);
        assert_eq!(page.len(), 8);
        assert!(page.iter().all(|a| a.is_published));
        // newest first
        assert!(page.windows(2).all(|w| w[0].created_at > w[1].created_at));
    }

    #[tokio::test]
    async fn test_delete_cascades_engagement() {
        let store = MemoryStore::new();
        store.insert_article(&article("a1", 1, true)).await.unwrap();
        store.insert_engagement(Engagement::Like, "u1", "a1", 1).await.unwrap();
        store.insert_engagement(Engagement::Save, "u1", "a1", 1).await.unwrap();

        assert!(store.delete_article("a1").await.unwrap());
        assert!(!store.has_engagement(Engagement::Like, "u1", "a1").await.unwrap());
        assert!(!store.has_engagement(Engagement::Save, "u1", "a1").await.unwrap());
        assert!(!store.delete_article("a1").await.unwrap());
    }

    #[tokio::test]
    async fn test_engagement_is_unique() {
        let store = MemoryStore::new();
        store.insert_article(&article("a1", 1, true)).await.unwrap();
        assert!(store.insert_engagement(Engagement::Like, "u1", "a1", 1).await.unwrap());
        assert!(!store.insert_engagement(Engagement::Like, "u1", "a1", 2).await.unwrap());
        assert_eq!(store.count_engagements(Engagement::Like, "a1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_adjust_likes_floors_at_zero() {
        let store = MemoryStore::new();
        store.insert_article(&article("a1", 1, true)).await.unwrap();
        store.adjust_likes("a1", -1).await.unwrap();
        assert_eq!(store.find_article("a1").await.unwrap().unwrap().likes, 0);
        store.adjust_likes("a1", 1).await.unwrap();
        assert_eq!(store.find_article("a1").await.unwrap().unwrap().likes, 1);
    }

    #[tokio::test]
    async fn test_saved_ids_newest_first() {
        let store = MemoryStore::new();
        for (id, at) in [("a1", 10), ("a2", 30), ("a3", 20)] {
            store.insert_article(&article(id, 1, true)).await.unwrap();
            store.insert_engagement(Engagement::Save, "u1", id, at).await.unwrap();
        }
        store.insert_engagement(Engagement::Save, "u2", "a1", 40).await.unwrap();

        let (ids, total) = store
            .engaged_article_ids(Engagement::Save, "u1", Pagination { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(ids, vec!["a2".to_string(), "a3".to_string()]);
    }
}
