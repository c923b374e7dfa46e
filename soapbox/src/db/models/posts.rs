//! Database models for community posts.

use crate::api::models::posts::{Category, PostUpdate};
use crate::types::{PostId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new post
#[derive(Debug, Clone)]
pub struct PostCreateDBRequest {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub images: Vec<String>,
    /// Always the authenticated caller, never taken from the request body.
    pub author_id: UserId,
    pub anonymous: bool,
}

/// Database request for updating a post
#[derive(Debug, Clone, Default)]
pub struct PostUpdateDBRequest {
    pub title: Option<String>,
    /// Recomputed alongside the title; the repository never derives it.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub images: Option<Vec<String>>,
    pub anonymous: Option<bool>,
    pub solved: Option<bool>,
}

impl From<PostUpdate> for PostUpdateDBRequest {
    fn from(api: PostUpdate) -> Self {
        let slug = api.title.as_deref().map(crate::api::models::posts::slugify);
        Self {
            title: api.title,
            slug,
            description: api.description,
            category: api.category,
            images: api.images,
            anonymous: api.anonymous,
            solved: api.solved,
        }
    }
}

/// Database response for a post
#[derive(Debug, Clone)]
pub struct PostDBResponse {
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub images: Vec<String>,
    pub author_id: UserId,
    pub anonymous: bool,
    pub solved: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// One month's worth of activity for the yearly statistics endpoint
#[derive(Debug, Clone)]
pub struct MonthlyPostStats {
    pub month: u32,
    pub count: i64,
    pub titles: Vec<String>,
}
