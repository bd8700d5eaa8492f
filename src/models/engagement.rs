use serde::{Deserialize, Serialize};
use std::fmt;

/// The two per-user relations kept in the engagement ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engagement {
    Like,
    Save,
}

impl Engagement {
    pub fn collection(&self) -> &'static str {
        match self {
            Engagement::Like => "article_likes",
            Engagement::Save => "saved_articles",
        }
    }
}

impl fmt::Display for Engagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engagement::Like => write!(f, "like"),
            Engagement::Save => write!(f, "save"),
        }
    }
}

/// One like or save record; (user_id, article_id) is unique per kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub user_id: String,
    pub article_id: String,
    /// Unix timestamp in milliseconds (liked-at / saved-at)
    pub created_at: i64,
}

/// Result of a toggle: whether the relation exists afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}
