//! API request/response models for posts.

use crate::db::models::posts::{MonthlyPostStats, PostDBResponse};
use crate::types::PostId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;

/// Report category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Infrastructure,
    Safety,
    Environment,
    Other,
}

/// Turn a post title into a URL-safe slug.
///
/// Lowercases, collapses runs of non-alphanumeric characters into single
/// dashes, and strips leading/trailing dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Create request. The author is taken from the session, never from the body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostCreate {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub images: Vec<String>,
    /// Hide the author in all API responses for this post
    #[serde(default)]
    pub anonymous: bool,
}

/// Moderation update request. Changing the title re-derives the slug.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub images: Option<Vec<String>>,
    pub anonymous: Option<bool>,
    pub solved: Option<bool>,
}

/// Author attribution embedded in post responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostAuthor {
    pub name: String,
    pub photo: String,
}

/// Post representation returned by the API.
///
/// `author` is `None` for anonymous posts; the attribution stays in the
/// database but never leaves it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Post {
    #[schema(value_type = String, format = "uuid")]
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub images: Vec<String>,
    pub author: Option<PostAuthor>,
    pub anonymous: bool,
    pub solved: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Build the API representation from a database row plus the author's
    /// attribution. Anonymous posts drop the author regardless of what the
    /// caller passes.
    pub fn from_db(db: PostDBResponse, author: Option<PostAuthor>) -> Self {
        let author = if db.anonymous { None } else { author };
        Self {
            id: db.id,
            title: db.title,
            slug: db.slug,
            description: db.description,
            category: db.category,
            images: db.images,
            author,
            anonymous: db.anonymous,
            solved: db.solved,
            created_at: db.created_at,
        }
    }
}

/// Query parameters for listing posts.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListPostsQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only posts in this category
    pub category: Option<Category>,

    /// Only posts with this solved state
    pub solved: Option<bool>,
}

/// One month's worth of post activity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyStat {
    /// Calendar month (1-12)
    pub month: u32,
    /// Number of posts created in that month
    pub count: i64,
    /// Titles of the posts created in that month
    pub titles: Vec<String>,
}

impl From<MonthlyPostStats> for MonthlyStat {
    fn from(db: MonthlyPostStats) -> Self {
        Self {
            month: db.month,
            count: db.count,
            titles: db.titles,
        }
    }
}

// Response envelopes

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostData {
    pub post: Post,
}

/// `{"status": "success", "data": {"post": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostEnvelope {
    pub status: String,
    pub data: PostData,
}

impl PostEnvelope {
    pub fn new(post: Post) -> Self {
        Self {
            status: "success".to_string(),
            data: PostData { post },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostListData {
    pub posts: Vec<Post>,
}

/// `{"status": "success", "results": N, "data": {"posts": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostListEnvelope {
    pub status: String,
    pub results: usize,
    pub data: PostListData,
}

impl PostListEnvelope {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            status: "success".to_string(),
            results: posts.len(),
            data: PostListData { posts },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyStatsData {
    pub stats: Vec<MonthlyStat>,
}

/// `{"status": "success", "data": {"stats": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MonthlyStatsEnvelope {
    pub status: String,
    pub data: MonthlyStatsData,
}

impl MonthlyStatsEnvelope {
    pub fn new(stats: Vec<MonthlyStat>) -> Self {
        Self {
            status: "success".to_string(),
            data: MonthlyStatsData { stats },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Broken streetlight on 5th Ave!"), "broken-streetlight-on-5th-ave");
        assert_eq!(slugify("  Pothole --- Main St  "), "pothole-main-st");
        assert_eq!(slugify("UPPER case Title"), "upper-case-title");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_anonymous_post_drops_author() {
        let db = PostDBResponse {
            id: uuid::Uuid::new_v4(),
            title: "Fallen tree blocks path".to_string(),
            slug: "fallen-tree-blocks-path".to_string(),
            description: "Large oak across the cycle path".to_string(),
            category: Category::Environment,
            images: vec![],
            author_id: uuid::Uuid::new_v4(),
            anonymous: true,
            solved: false,
            deleted: false,
            created_at: Utc::now(),
        };

        let post = Post::from_db(
            db,
            Some(PostAuthor {
                name: "Alice".to_string(),
                photo: "default.jpg".to_string(),
            }),
        );

        assert!(post.author.is_none());
        assert!(post.anonymous);
    }
}
