//! Database repository for users.

use crate::types::{UserId, abbrev_uuid};
use crate::{
    api::models::users::Role,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

impl Default for UserFilter {
    fn default() -> Self {
        Self { skip: 0, limit: 50 }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub photo: String,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub password_reset_token_hash: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            photo: user.photo,
            created_at: user.created_at,
            password_changed_at: user.password_changed_at,
            password_reset_token_hash: user.password_reset_token_hash,
            password_reset_expires: user.password_reset_expires,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // Always generate a new ID for users
        let user_id = Uuid::new_v4();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, photo, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.role)
        .bind(request.photo.as_deref().unwrap_or("default.jpg"))
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user.into())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(Into::into))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<UserId>) -> Result<std::collections::HashMap<Self::Id, UserDBResponse>> {
        let mut result = std::collections::HashMap::new();

        // SQLite has no array binding; the call sites here only ever pass a
        // handful of ids, so one lookup per id is fine.
        for id in ids {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self.db)
                .await?;

            if let Some(user) = user {
                result.insert(user.id, user.into());
            }
        }

        Ok(result)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC LIMIT ? OFFSET ?")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                role = COALESCE(?, role),
                photo = COALESCE(?, photo)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(request.role)
        .bind(&request.photo)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user.into())
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Look up a user by email. The `email` column collates case-insensitively,
    /// so callers do not have to normalize first (they still do on write).
    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(Into::into))
    }

    /// Record an outstanding password reset ticket (digest + expiry),
    /// replacing any previous one.
    #[instrument(skip(self, token_hash), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn set_password_reset(&mut self, id: UserId, token_hash: &str, expires: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_reset_token_hash = ?, password_reset_expires = ? WHERE id = ?")
            .bind(token_hash)
            .bind(expires)
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Drop any outstanding reset ticket, e.g. after the reset email failed to
    /// send.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn clear_password_reset(&mut self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET password_reset_token_hash = NULL, password_reset_expires = NULL WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Atomically consume a reset ticket: match on the digest, require it to be
    /// unexpired, install the new password hash and clear the ticket fields in
    /// a single conditional UPDATE. Exactly one of any number of concurrent
    /// presentations of the same ticket can win; everyone else sees `None`.
    #[instrument(skip(self, token_hash, new_password_hash), err)]
    pub async fn consume_password_reset(&mut self, token_hash: &str, new_password_hash: &str) -> Result<Option<UserDBResponse>> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                password_hash = ?,
                password_changed_at = ?,
                password_reset_token_hash = NULL,
                password_reset_expires = NULL
            WHERE password_reset_token_hash = ?
              AND password_reset_expires > ?
            RETURNING *
            "#,
        )
        .bind(new_password_hash)
        .bind(now)
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user.map(Into::into))
    }

    /// Install a new password hash and stamp `password_changed_at`, which
    /// invalidates sessions issued before that instant.
    #[instrument(skip(self, new_password_hash), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn update_password(&mut self, id: UserId, new_password_hash: &str, changed_at: DateTime<Utc>) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET password_hash = ?, password_changed_at = ? WHERE id = ? RETURNING *",
        )
        .bind(new_password_hash)
        .bind(changed_at)
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use chrono::Duration;
    use sqlx::SqlitePool;

    fn create_request(email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$fake-hash".to_string(),
            role: Role::User,
            photo: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("test@example.com")).await.unwrap();
        assert_eq!(user.name, "Test User");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.photo, "default.jpg");
        assert!(user.password_changed_at.is_none());
        assert!(user.password_reset_token_hash.is_none());

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.email, "test@example.com");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_is_unique_violation(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("dup@example.com")).await.unwrap();

        // The unique index collates case-insensitively
        let err = repo.create(&create_request("DUP@example.com")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(err.violates("users.email"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_user_by_email(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("email@example.com")).await.unwrap();

        let found = repo.get_user_by_email("email@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        // NOCASE collation makes mixed-case lookups hit too
        let found = repo.get_user_by_email("Email@Example.com").await.unwrap();
        assert!(found.is_some());

        let missing = repo.get_user_by_email("nobody@example.com").await.unwrap();
        assert!(missing.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_only_touches_provided_fields(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("update@example.com")).await.unwrap();

        let update = UserUpdateDBRequest {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = repo.update(created.id, &update).await.unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, "update@example.com");
        assert_eq!(updated.role, Role::User);

        let update = UserUpdateDBRequest {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let updated = repo.update(created.id, &update).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.name, "Renamed");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_user_is_not_found(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let err = repo.update(Uuid::new_v4(), &UserUpdateDBRequest::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("delete@example.com")).await.unwrap();
        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_consume_password_reset_exactly_once(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("reset@example.com")).await.unwrap();
        repo.set_password_reset(created.id, "digest-abc", Utc::now() + Duration::minutes(5))
            .await
            .unwrap();

        let consumed = repo.consume_password_reset("digest-abc", "$argon2id$new-hash").await.unwrap();
        let user = consumed.expect("first presentation should win");
        assert_eq!(user.password_hash, "$argon2id$new-hash");
        assert!(user.password_changed_at.is_some());
        assert!(user.password_reset_token_hash.is_none());
        assert!(user.password_reset_expires.is_none());

        // Same digest again: the fields are gone, nothing matches
        let again = repo.consume_password_reset("digest-abc", "$argon2id$other").await.unwrap();
        assert!(again.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_consume_expired_reset_fails(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("expired@example.com")).await.unwrap();
        repo.set_password_reset(created.id, "digest-old", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        let consumed = repo.consume_password_reset("digest-old", "$argon2id$new-hash").await.unwrap();
        assert!(consumed.is_none());

        // The expired ticket stays in place until overwritten or consumed
        let user = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "$argon2id$fake-hash");
        assert_eq!(user.password_reset_token_hash.as_deref(), Some("digest-old"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_fresh_reset_overwrites_previous(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("overwrite@example.com")).await.unwrap();
        repo.set_password_reset(created.id, "digest-one", Utc::now() + Duration::minutes(5))
            .await
            .unwrap();
        repo.set_password_reset(created.id, "digest-two", Utc::now() + Duration::minutes(5))
            .await
            .unwrap();

        assert!(repo.consume_password_reset("digest-one", "$argon2id$x").await.unwrap().is_none());
        assert!(repo.consume_password_reset("digest-two", "$argon2id$x").await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_password_stamps_changed_at(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("changepw@example.com")).await.unwrap();
        let changed_at = Utc::now();
        let updated = repo.update_password(created.id, "$argon2id$fresh", changed_at).await.unwrap();

        assert_eq!(updated.password_hash, "$argon2id$fresh");
        assert_eq!(updated.password_changed_at, Some(changed_at));
    }
}
