//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Platform role. Admins can manage users and moderate posts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Sanitized user representation returned by the API.
///
/// Never carries the password hash or reset ticket fields; those exist only
/// on the database models.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub photo: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for User {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            role: db.role,
            photo: db.photo,
            created_at: db.created_at,
        }
    }
}

/// The authenticated user, resolved from the session token on every request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub photo: String,
    pub created_at: DateTime<Utc>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            role: db.role,
            photo: db.photo,
            created_at: db.created_at,
        }
    }
}

impl From<CurrentUser> for User {
    fn from(user: CurrentUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            photo: user.photo,
            created_at: user.created_at,
        }
    }
}

/// Admin update request. Password changes go through the dedicated
/// password endpoints, never through here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub photo: Option<String>,
}

/// Self-service profile update. Only `name` and `email` are applied;
/// password fields are rejected outright so nobody sneaks a credential
/// change past the current-password check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

// Response envelopes

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserData {
    pub user: User,
}

/// `{"status": "success", "data": {"user": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub status: String,
    pub data: UserData,
}

impl UserEnvelope {
    pub fn new(user: User) -> Self {
        Self {
            status: "success".to_string(),
            data: UserData { user },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListData {
    pub users: Vec<User>,
}

/// `{"status": "success", "results": N, "data": {"users": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListEnvelope {
    pub status: String,
    pub results: usize,
    pub data: UserListData,
}

impl UserListEnvelope {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            status: "success".to_string(),
            results: users.len(),
            data: UserListData { users },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUserData {
    #[serde(rename = "currentUser")]
    pub current_user: Option<User>,
}

/// `{"status": "success", "data": {"currentUser": ... | null}}`
///
/// Returned by the session peek endpoint; `currentUser` is `null` when the
/// session predates the user's last password change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUserEnvelope {
    pub status: String,
    pub data: CurrentUserData,
}

impl CurrentUserEnvelope {
    pub fn new(current_user: Option<User>) -> Self {
        Self {
            status: "success".to_string(),
            data: CurrentUserData { current_user },
        }
    }
}
