use uuid::Uuid;

use crate::database::Datastore;
use crate::models::{
    now_millis, Article, ArticleChanges, ArticleListParams, ArticleQuery, ArticleResponse, Audience,
    CreateArticleRequest, Engagement, PaginatedArticles, Pagination, PaginationParams, Role, ToggleOutcome,
    UpdateArticleRequest, User,
};
use crate::utils::validation::{normalize_tags, validate_image_url, validate_text, TITLE_MAX};
use crate::utils::{AppError, KeyedLocks};

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Article with ID \"{}\" not found.", id))
}

fn is_admin(viewer: Option<&User>) -> bool {
    viewer.map(|u| u.role == Role::Admin).unwrap_or(false)
}

/// Drafts are only visible to admins
pub fn is_visible(article: &Article, viewer: Option<&User>) -> bool {
    article.is_published || is_admin(viewer)
}

/// Adds the caller's like/save flags; anonymous callers get `false` for both
pub async fn annotate(
    store: &dyn Datastore,
    article: Article,
    viewer: Option<&User>,
) -> Result<ArticleResponse, AppError> {
    let Some(user) = viewer else {
        return Ok(article.into());
    };
    let liked = store.has_engagement(Engagement::Like, &user.id, &article.id).await?;
    let saved = store.has_engagement(Engagement::Save, &user.id, &article.id).await?;
    Ok(ArticleResponse::annotated(article, liked, saved))
}

async fn annotate_page(
    store: &dyn Datastore,
    articles: Vec<Article>,
    total: u64,
    pagination: Pagination,
    viewer: Option<&User>,
) -> Result<PaginatedArticles, AppError> {
    let mut data = Vec::with_capacity(articles.len());
    for article in articles {
        data.push(annotate(store, article, viewer).await?);
    }
    Ok(PaginatedArticles::new(data, total, pagination))
}

async fn find_visible(store: &dyn Datastore, id: &str, viewer: Option<&User>) -> Result<Article, AppError> {
    match store.find_article(id).await? {
        Some(article) if is_visible(&article, viewer) => Ok(article),
        _ => Err(not_found(id)),
    }
}

pub async fn create_article(store: &dyn Datastore, request: &CreateArticleRequest) -> Result<ArticleResponse, AppError> {
    validate_text("Title", &request.title, TITLE_MAX)?;
    if request.body.trim().is_empty() {
        return Err(AppError::Validation("Body should not be empty.".into()));
    }
    if let Some(url) = &request.image_url {
        validate_image_url(url)?;
    }
    let tags = normalize_tags(&request.tags)?;

    let now = now_millis();
    let article = Article {
        id: Uuid::new_v4().to_string(),
        title: request.title.trim().to_string(),
        body: request.body.clone(),
        image_url: request.image_url.clone(),
        category: request.category,
        tags,
        likes: 0,
        is_published: request.is_published.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    store.insert_article(&article).await?;
    log::info!("✅ Article created: {} ({})", article.title, article.id);
    Ok(article.into())
}

/// Published articles only, annotated for the caller when signed in
pub async fn list_public(
    store: &dyn Datastore,
    params: &ArticleListParams,
    viewer: Option<&User>,
) -> Result<PaginatedArticles, AppError> {
    let query = ArticleQuery::from_params(params, Audience::Public)?;
    let (articles, total) = store.query_articles(&query).await?;
    annotate_page(store, articles, total, query.pagination, viewer).await
}

/// Admin view: drafts included unless filtered by `publishedStatus`
pub async fn list_admin(
    store: &dyn Datastore,
    params: &ArticleListParams,
    viewer: &User,
) -> Result<PaginatedArticles, AppError> {
    let query = ArticleQuery::from_params(params, Audience::Admin)?;
    let (articles, total) = store.query_articles(&query).await?;
    annotate_page(store, articles, total, query.pagination, Some(viewer)).await
}

pub async fn get_article(store: &dyn Datastore, id: &str, viewer: Option<&User>) -> Result<ArticleResponse, AppError> {
    let article = find_visible(store, id, viewer).await?;
    annotate(store, article, viewer).await
}

pub async fn update_article(
    store: &dyn Datastore,
    id: &str,
    request: &UpdateArticleRequest,
    viewer: &User,
) -> Result<ArticleResponse, AppError> {
    let mut changes = ArticleChanges::default();
    if let Some(title) = &request.title {
        validate_text("Title", title, TITLE_MAX)?;
        changes.title = Some(title.trim().to_string());
    }
    if let Some(body) = &request.body {
        if body.trim().is_empty() {
            return Err(AppError::Validation("Body should not be empty.".into()));
        }
        changes.body = Some(body.clone());
    }
    if let Some(url) = &request.image_url {
        validate_image_url(url)?;
        changes.image_url = Some(url.clone());
    }
    if let Some(tags) = &request.tags {
        changes.tags = Some(normalize_tags(tags)?);
    }
    changes.category = request.category;
    changes.is_published = request.is_published;

    let article = if changes.is_empty() {
        store.find_article(id).await?
    } else {
        store.update_article(id, &changes, now_millis()).await?
    }
    .ok_or_else(|| not_found(id))?;

    log::info!("✅ Article updated: {}", article.id);
    annotate(store, article, Some(viewer)).await
}

pub async fn delete_article(store: &dyn Datastore, id: &str) -> Result<(), AppError> {
    if !store.delete_article(id).await? {
        return Err(not_found(id));
    }
    log::info!("🗑️  Article deleted: {}", id);
    Ok(())
}

/// Flips the user's like or save on an article.
///
/// Toggles on the same (user, article, kind) run one at a time, and the like
/// counter moves only when a record was actually inserted or removed. Adding
/// requires the article to be visible to the user; removing does not.
pub async fn toggle(
    store: &dyn Datastore,
    locks: &KeyedLocks,
    kind: Engagement,
    article_id: &str,
    user: &User,
) -> Result<(ArticleResponse, ToggleOutcome), AppError> {
    let _guard = locks.lock(format!("{}:{}:{}", kind, user.id, article_id)).await;

    // Removing an existing record never depends on the article still being visible
    let outcome = if store.remove_engagement(kind, &user.id, article_id).await? {
        if kind == Engagement::Like {
            store.adjust_likes(article_id, -1).await?;
        }
        ToggleOutcome::Removed
    } else {
        find_visible(store, article_id, Some(user)).await?;
        if store.insert_engagement(kind, &user.id, article_id, now_millis()).await? && kind == Engagement::Like {
            store.adjust_likes(article_id, 1).await?;
        }
        ToggleOutcome::Added
    };

    log::info!("👍 {} {:?} by {} on article {}", kind, outcome, user.email, article_id);

    let article = store.find_article(article_id).await?.ok_or_else(|| not_found(article_id))?;
    Ok((annotate(store, article, Some(user)).await?, outcome))
}

pub async fn toggle_like(
    store: &dyn Datastore,
    locks: &KeyedLocks,
    article_id: &str,
    user: &User,
) -> Result<ArticleResponse, AppError> {
    toggle(store, locks, Engagement::Like, article_id, user).await.map(|(article, _)| article)
}

pub async fn toggle_save(
    store: &dyn Datastore,
    locks: &KeyedLocks,
    article_id: &str,
    user: &User,
) -> Result<ArticleResponse, AppError> {
    toggle(store, locks, Engagement::Save, article_id, user).await.map(|(article, _)| article)
}

/// The user's bookmarks, most recently saved first
pub async fn saved_articles(
    store: &dyn Datastore,
    params: &PaginationParams,
    user: &User,
) -> Result<PaginatedArticles, AppError> {
    let pagination = Pagination::parse(params.page, params.limit)?;
    let (ids, total) = store.engaged_article_ids(Engagement::Save, &user.id, pagination).await?;

    let mut articles = Vec::with_capacity(ids.len());
    for id in ids {
        match store.find_article(&id).await? {
            Some(article) => articles.push(article),
            None => log::debug!("Saved article {} vanished while listing", id),
        }
    }
    annotate_page(store, articles, total, pagination, Some(user)).await
}
