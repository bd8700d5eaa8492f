pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{ArticleStore, Datastore, EngagementStore, UserStore};

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;
use std::time::Duration;

use crate::models::{
    Article, ArticleChanges, ArticleQuery, Engagement, EngagementRecord, Pagination, ProfileChanges, User,
};
use crate::utils::AppError;

const DEFAULT_DB_NAME: &str = "article_platform";
const USERS: &str = "users";
const ARTICLES: &str = "articles";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(Duration::from_secs(300));
        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));

        let db_name = client_options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DB_NAME.to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        // Test connection
        db.run_command(doc! { "ping": 1 }).await?;
        log::info!("✅ Connected to MongoDB database '{}'", db_name);

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Unique keys back the email and engagement invariants; the rest serve listings
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        let users = self.collection::<Document>(USERS);
        users
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build())
            .await?;
        log::info!("   ✅ Index ready: users(email) unique");

        let articles = self.collection::<Document>(ARTICLES);
        for keys in [
            doc! { "title": 1 },
            doc! { "category": 1 },
            doc! { "tags": 1 },
            doc! { "is_published": 1, "created_at": -1 },
        ] {
            let label = keys.keys().cloned().collect::<Vec<_>>().join(", ");
            match articles.create_index(IndexModel::builder().keys(keys).build()).await {
                Ok(_) => log::info!("   ✅ Index ready: articles({})", label),
                Err(e) => log::debug!("   ℹ️  Index articles({}) skipped: {}", label, e),
            }
        }

        for kind in [Engagement::Like, Engagement::Save] {
            let collection = self.collection::<Document>(kind.collection());
            collection
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "article_id": 1 })
                        .options(unique())
                        .build(),
                )
                .await?;
            match collection
                .create_index(IndexModel::builder().keys(doc! { "user_id": 1, "created_at": -1 }).build())
                .await
            {
                Ok(_) => log::info!("   ✅ Index ready: {}(user_id, article_id) unique", kind.collection()),
                Err(e) => log::debug!("   ℹ️  Index {}(user_id) skipped: {}", kind.collection(), e),
            }
        }

        log::info!("✅ Database indexes ready");
        Ok(())
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    fn users(&self) -> Collection<User> {
        self.collection(USERS)
    }

    fn articles(&self) -> Collection<Article> {
        self.collection(ARTICLES)
    }

    fn engagements(&self, kind: Engagement) -> Collection<EngagementRecord> {
        self.collection(kind.collection())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000
    )
}

/// Escapes regex metacharacters so search keywords match literally
pub fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\.^$|?*+()[]{}-/".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Translates a listing query into a MongoDB filter
pub fn article_filter(query: &ArticleQuery) -> Document {
    let mut filter = Document::new();

    if let Some(published) = query.published {
        filter.insert("is_published", published);
    }
    if let Some(category) = query.category {
        filter.insert("category", category.as_str());
    }
    if !query.tags.is_empty() {
        filter.insert("tags", doc! { "$in": query.tags.clone() });
    }
    if let Some(search) = &query.search {
        let pattern = escape_regex(search);
        filter.insert(
            "$or",
            vec![
                doc! { "title": { "$regex": &pattern, "$options": "i" } },
                doc! { "body": { "$regex": &pattern, "$options": "i" } },
            ],
        );
    }

    filter
}

/// Sort by the requested field with `_id` as the tie-breaker
pub fn article_sort(query: &ArticleQuery) -> Document {
    let dir = query.direction.as_i32();
    let mut sort = Document::new();
    sort.insert(query.sort_by.storage_key(), dir);
    sort.insert("_id", dir);
    sort
}

fn article_set(changes: &ArticleChanges, updated_at: i64) -> Document {
    let mut set = doc! { "updated_at": updated_at };
    if let Some(title) = &changes.title {
        set.insert("title", title.as_str());
    }
    if let Some(body) = &changes.body {
        set.insert("body", body.as_str());
    }
    if let Some(image_url) = &changes.image_url {
        set.insert("image_url", image_url.as_str());
    }
    if let Some(category) = changes.category {
        set.insert("category", category.as_str());
    }
    if let Some(tags) = &changes.tags {
        set.insert("tags", tags.clone());
    }
    if let Some(is_published) = changes.is_published {
        set.insert("is_published", is_published);
    }
    set
}

#[async_trait]
impl UserStore for MongoDB {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "_id": id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(format!(
                "User with email \"{}\" already exists.",
                user.email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_profile(
        &self,
        id: &str,
        changes: &ProfileChanges,
        updated_at: i64,
    ) -> Result<Option<User>, AppError> {
        let mut set = doc! { "updated_at": updated_at };
        if let Some(first_name) = &changes.first_name {
            set.insert("first_name", first_name.as_str());
        }
        if let Some(last_name) = &changes.last_name {
            set.insert("last_name", last_name.as_str());
        }
        if let Some(email) = &changes.email {
            set.insert("email", email.as_str());
        }

        let result = self
            .users()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(format!(
                "Email \"{}\" is already in use.",
                changes.email.as_deref().unwrap_or_default()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_password(&self, id: &str, password_hash: &str, updated_at: i64) -> Result<bool, AppError> {
        let result = self
            .users()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "password_hash": password_hash, "updated_at": updated_at } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait]
impl ArticleStore for MongoDB {
    async fn insert_article(&self, article: &Article) -> Result<(), AppError> {
        match self.articles().insert_one(article).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict("Article already exists.".into())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_article(&self, id: &str) -> Result<Option<Article>, AppError> {
        Ok(self.articles().find_one(doc! { "_id": id }).await?)
    }

    async fn query_articles(&self, query: &ArticleQuery) -> Result<(Vec<Article>, u64), AppError> {
        let filter = article_filter(query);
        let total = self.articles().count_documents(filter.clone()).await?;

        let articles: Vec<Article> = self
            .articles()
            .find(filter)
            .sort(article_sort(query))
            .skip(query.pagination.skip())
            .limit(query.pagination.limit as i64)
            .await?
            .try_collect()
            .await?;

        Ok((articles, total))
    }

    async fn update_article(&self, id: &str, changes: &ArticleChanges, updated_at: i64) -> Result<Option<Article>, AppError> {
        Ok(self
            .articles()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": article_set(changes, updated_at) })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_article(&self, id: &str) -> Result<bool, AppError> {
        let result = self.articles().delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }

        for kind in [Engagement::Like, Engagement::Save] {
            let removed = self.engagements(kind).delete_many(doc! { "article_id": id }).await?;
            if removed.deleted_count > 0 {
                log::debug!("Removed {} {} records of article {}", removed.deleted_count, kind, id);
            }
        }
        Ok(true)
    }

    async fn adjust_likes(&self, id: &str, delta: i64) -> Result<(), AppError> {
        // Pipeline update keeps the clamp inside a single atomic write
        let pipeline = vec![doc! {
            "$set": { "likes": { "$max": [0_i64, { "$add": [{ "$ifNull": ["$likes", 0_i64] }, delta] }] } }
        }];
        self.articles().update_one(doc! { "_id": id }, pipeline).await?;
        Ok(())
    }

    async fn count_articles(&self) -> Result<u64, AppError> {
        Ok(self.articles().count_documents(doc! {}).await?)
    }
}

#[async_trait]
impl EngagementStore for MongoDB {
    async fn has_engagement(&self, kind: Engagement, user_id: &str, article_id: &str) -> Result<bool, AppError> {
        let found = self
            .engagements(kind)
            .find_one(doc! { "user_id": user_id, "article_id": article_id })
            .await?;
        Ok(found.is_some())
    }

    async fn insert_engagement(&self, kind: Engagement, user_id: &str, article_id: &str, at: i64) -> Result<bool, AppError> {
        if self.find_article(article_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Article with ID \"{}\" not found.", article_id)));
        }

        let record = EngagementRecord {
            user_id: user_id.to_string(),
            article_id: article_id.to_string(),
            created_at: at,
        };
        match self.engagements(kind).insert_one(&record).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_engagement(&self, kind: Engagement, user_id: &str, article_id: &str) -> Result<bool, AppError> {
        let result = self
            .engagements(kind)
            .delete_one(doc! { "user_id": user_id, "article_id": article_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn engaged_article_ids(
        &self,
        kind: Engagement,
        user_id: &str,
        pagination: Pagination,
    ) -> Result<(Vec<String>, u64), AppError> {
        let filter = doc! { "user_id": user_id };
        let total = self.engagements(kind).count_documents(filter.clone()).await?;

        let records: Vec<EngagementRecord> = self
            .engagements(kind)
            .find(filter)
            .sort(doc! { "created_at": -1, "article_id": 1 })
            .skip(pagination.skip())
            .limit(pagination.limit as i64)
            .await?
            .try_collect()
            .await?;

        Ok((records.into_iter().map(|r| r.article_id).collect(), total))
    }

    async fn count_engagements(&self, kind: Engagement, article_id: &str) -> Result<u64, AppError> {
        Ok(self
            .engagements(kind)
            .count_documents(doc! { "article_id": article_id })
            .await?)
    }
}

#[async_trait]
impl Datastore for MongoDB {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
