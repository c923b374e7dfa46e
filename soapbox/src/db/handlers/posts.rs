//! Database repository for community posts.

use crate::types::{PostId, UserId, abbrev_uuid};
use crate::{
    api::models::posts::Category,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::posts::{MonthlyPostStats, PostCreateDBRequest, PostDBResponse, PostUpdateDBRequest},
    },
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, types::Json};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing posts
///
/// `archived` flips the query between the public view (`deleted = 0`) and the
/// admin archive (`deleted = 1`); the two sets never mix in one listing.
#[derive(Debug, Clone)]
pub struct PostFilter {
    pub skip: i64,
    pub limit: i64,
    pub category: Option<Category>,
    pub solved: Option<bool>,
    pub archived: bool,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 50,
            category: None,
            solved: None,
            archived: false,
        }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Post {
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub images: Json<Vec<String>>,
    pub author_id: UserId,
    pub anonymous: bool,
    pub solved: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for PostDBResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            description: post.description,
            category: post.category,
            images: post.images.0,
            author_id: post.author_id,
            anonymous: post.anonymous,
            solved: post.solved,
            deleted: post.deleted,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MonthlyRow {
    month: i64,
    count: i64,
    titles: String,
}

pub struct Posts<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Posts<'c> {
    type CreateRequest = PostCreateDBRequest;
    type UpdateRequest = PostUpdateDBRequest;
    type Response = PostDBResponse;
    type Id = PostId;
    type Filter = PostFilter;

    #[instrument(skip(self, request), fields(title = %request.title, author_id = %abbrev_uuid(&request.author_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let post_id = Uuid::new_v4();

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, title, slug, description, category, images, author_id, anonymous, solved, deleted, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?)
            RETURNING *
            "#,
        )
        .bind(post_id)
        .bind(&request.title)
        .bind(&request.slug)
        .bind(&request.description)
        .bind(request.category)
        .bind(Json(&request.images))
        .bind(request.author_id)
        .bind(request.anonymous)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(post.into())
    }

    /// Fetches by id regardless of the soft-delete flag; the caller decides
    /// whether a deleted row should be visible.
    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(post.map(Into::into))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<PostId>) -> Result<std::collections::HashMap<Self::Id, PostDBResponse>> {
        let mut result = std::collections::HashMap::new();

        for id in ids {
            let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?;

            if let Some(post) = post {
                result.insert(post.id, post.into());
            }
        }

        Ok(result)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip, archived = filter.archived), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE deleted = ?
              AND category = COALESCE(?, category)
              AND solved = COALESCE(?, solved)
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(filter.archived)
        .bind(filter.category)
        .bind(filter.solved)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(posts.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(post_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET
                title = COALESCE(?, title),
                slug = COALESCE(?, slug),
                description = COALESCE(?, description),
                category = COALESCE(?, category),
                images = COALESCE(?, images),
                anonymous = COALESCE(?, anonymous),
                solved = COALESCE(?, solved)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(&request.slug)
        .bind(&request.description)
        .bind(request.category)
        .bind(request.images.as_ref().map(Json))
        .bind(request.anonymous)
        .bind(request.solved)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(post.into())
    }
}

impl<'c> Posts<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Flag a post as deleted so it drops out of public queries.
    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn soft_delete(&mut self, id: PostId) -> Result<PostDBResponse> {
        let post = sqlx::query_as::<_, Post>("UPDATE posts SET deleted = 1 WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(post.into())
    }

    /// Bring an archived post back into the public view.
    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn restore(&mut self, id: PostId) -> Result<PostDBResponse> {
        let post = sqlx::query_as::<_, Post>("UPDATE posts SET deleted = 0 WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(post.into())
    }

    /// Per-month activity for one calendar year: how many posts landed in each
    /// month and their titles, busiest month first. Archived posts are not
    /// counted. Months without posts are absent from the result.
    #[instrument(skip(self), err)]
    pub async fn monthly_stats(&mut self, year: i32) -> Result<Vec<MonthlyPostStats>> {
        let start = DateTime::<Utc>::from_naive_utc_and_offset(
            chrono::NaiveDate::from_ymd_opt(year, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| DbError::Other(anyhow::anyhow!("invalid year {year}")))?,
            Utc,
        );
        let end = DateTime::<Utc>::from_naive_utc_and_offset(
            chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| DbError::Other(anyhow::anyhow!("invalid year {year}")))?,
            Utc,
        );

        let rows = sqlx::query_as::<_, MonthlyRow>(
            r#"
            SELECT CAST(strftime('%m', created_at) AS INTEGER) AS month,
                   COUNT(*) AS count,
                   json_group_array(title) AS titles
            FROM posts
            WHERE deleted = 0
              AND created_at >= ?
              AND created_at < ?
            GROUP BY month
            ORDER BY count DESC, month ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&mut *self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let titles: Vec<String> = serde_json::from_str(&row.titles).context("parse grouped titles")?;
                Ok(MonthlyPostStats {
                    month: row.month as u32,
                    count: row.count,
                    titles,
                })
            })
            .collect()
    }
}
