use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::format_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArticleCategory {
    Tech,
    News,
    General,
}

impl ArticleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleCategory::Tech => "tech",
            ArticleCategory::News => "news",
            ArticleCategory::General => "general",
        }
    }
}

impl fmt::Display for ArticleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "tech" => Ok(ArticleCategory::Tech),
            "news" => Ok(ArticleCategory::News),
            "general" => Ok(ArticleCategory::General),
            other => Err(format!("Invalid category '{}'", other)),
        }
    }
}

/// Article (stored in the `articles` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category: ArticleCategory,
    /// Display order is preserved; filtering treats it as a set
    #[serde(default)]
    pub tags: Vec<String>,
    /// Mirrors the number of like records for this article
    #[serde(default)]
    pub likes: i64,
    pub is_published: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Partial update; only `Some` fields are written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<ArticleCategory>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        *self == ArticleChanges::default()
    }

    pub fn apply(&self, article: &mut Article, now: i64) {
        if let Some(title) = &self.title {
            article.title = title.clone();
        }
        if let Some(body) = &self.body {
            article.body = body.clone();
        }
        if let Some(image_url) = &self.image_url {
            article.image_url = Some(image_url.clone());
        }
        if let Some(category) = self.category {
            article.category = category;
        }
        if let Some(tags) = &self.tags {
            article.tags = tags.clone();
        }
        if let Some(is_published) = self.is_published {
            article.is_published = is_published;
        }
        article.updated_at = now;
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub category: ArticleCategory,
    pub tags: Vec<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<ArticleCategory>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

/// Article as returned by the API, annotated for the calling user
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: String,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub category: ArticleCategory,
    pub tags: Vec<String>,
    pub likes: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub current_user_has_liked: bool,
    pub current_user_has_saved: bool,
}

impl ArticleResponse {
    pub fn annotated(article: Article, has_liked: bool, has_saved: bool) -> Self {
        ArticleResponse {
            id: article.id,
            title: article.title,
            body: article.body,
            image_url: article.image_url,
            category: article.category,
            tags: article.tags,
            likes: article.likes,
            is_published: article.is_published,
            created_at: format_timestamp(article.created_at),
            updated_at: format_timestamp(article.updated_at),
            current_user_has_liked: has_liked,
            current_user_has_saved: has_saved,
        }
    }
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        ArticleResponse::annotated(article, false, false)
    }
}
