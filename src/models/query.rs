use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::article::{Article, ArticleCategory, ArticleResponse};
use crate::utils::AppError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Which listing is being served; decides sortable fields and the published filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Public,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Title,
    Likes,
    UpdatedAt,
    Category,
    IsPublished,
}

impl SortField {
    /// Unknown or audience-restricted names fall back to `createdAt`
    pub fn parse(raw: Option<&str>, audience: Audience) -> Self {
        let field = match raw.map(str::trim) {
            Some("createdAt") => SortField::CreatedAt,
            Some("title") => SortField::Title,
            Some("likes") => SortField::Likes,
            Some("updatedAt") => SortField::UpdatedAt,
            Some("category") => SortField::Category,
            Some("isPublished") => SortField::IsPublished,
            _ => SortField::CreatedAt,
        };
        match (field, audience) {
            (SortField::Category | SortField::IsPublished, Audience::Public) => SortField::CreatedAt,
            _ => field,
        }
    }

    /// Field name in the stored document
    pub fn storage_key(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::Likes => "likes",
            SortField::UpdatedAt => "updated_at",
            SortField::Category => "category",
            SortField::IsPublished => "is_published",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than asc/desc (any case) falls back to descending
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("ASC") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Raw query string of the article listings
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ArticleListParams {
    /// Page number, starting at 1
    pub page: Option<i64>,
    /// Items per page (1-100)
    pub limit: Option<i64>,
    /// Case-insensitive keyword matched against title and body
    pub search: Option<String>,
    /// tech | news | general
    pub category: Option<String>,
    /// Comma-separated tags; an article matches if it has any of them
    pub tags: Option<String>,
    /// createdAt | title | likes | updatedAt (admin also: category | isPublished)
    pub sort_by: Option<String>,
    /// ASC | DESC
    pub sort_direction: Option<String>,
    /// Admin listing only: true | false | all
    pub published_status: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn parse(page: Option<i64>, limit: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(DEFAULT_PAGE as i64);
        if page < 1 {
            return Err(AppError::Validation("Page must be at least 1.".into()));
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT as i64);
        if limit < 1 {
            return Err(AppError::Validation("Limit must be at least 1.".into()));
        }
        if limit > MAX_LIMIT as i64 {
            return Err(AppError::Validation(format!("Limit cannot exceed {}.", MAX_LIMIT)));
        }
        Ok(Pagination {
            page: page as u64,
            limit: limit as u64,
        })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Validated, normalized article listing query
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleQuery {
    pub pagination: Pagination,
    pub search: Option<String>,
    pub category: Option<ArticleCategory>,
    pub tags: Vec<String>,
    /// `None` means both published and drafts
    pub published: Option<bool>,
    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl ArticleQuery {
    pub fn from_params(params: &ArticleListParams, audience: Audience) -> Result<Self, AppError> {
        let pagination = Pagination::parse(params.page, params.limit)?;

        let category = match params.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<ArticleCategory>()
                    .map_err(|_| AppError::Validation("Invalid category provided.".into()))?,
            ),
        };

        let published = match audience {
            Audience::Public => Some(true),
            Audience::Admin => match params.published_status.as_deref().map(str::trim) {
                None | Some("") | Some("all") => None,
                Some("true") => Some(true),
                Some("false") => Some(false),
                Some(other) => {
                    return Err(AppError::Validation(format!(
                        "Invalid publishedStatus '{}'. Must be true, false or all.",
                        other
                    )))
                }
            },
        };

        Ok(ArticleQuery {
            pagination,
            search: params
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            category,
            tags: parse_tags(params.tags.as_deref()),
            published,
            sort_by: SortField::parse(params.sort_by.as_deref(), audience),
            direction: SortDirection::parse(params.sort_direction.as_deref()),
        })
    }

    pub fn matches(&self, article: &Article) -> bool {
        if let Some(published) = self.published {
            if article.is_published != published {
                return false;
            }
        }
        if let Some(category) = self.category {
            if article.category != category {
                return false;
            }
        }
        if !self.tags.is_empty() && !article.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !article.title.to_lowercase().contains(&needle)
                && !article.body.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }

    /// Ordering by the sort field, ties broken by id in the same direction
    pub fn compare(&self, a: &Article, b: &Article) -> Ordering {
        let ordering = match self.sort_by {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Likes => a.likes.cmp(&b.likes),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Category => a.category.as_str().cmp(b.category.as_str()),
            SortField::IsPublished => a.is_published.cmp(&b.is_published),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Comma-separated tag filter; blanks dropped, duplicates removed
pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.unwrap_or("").split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedArticles {
    pub data: Vec<ArticleResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl PaginatedArticles {
    pub fn new(data: Vec<ArticleResponse>, total: u64, pagination: Pagination) -> Self {
        PaginatedArticles {
            data,
            total,
            page: pagination.page,
            limit: pagination.limit,
            total_pages: total_pages(total, pagination.limit),
        }
    }
}

pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}
