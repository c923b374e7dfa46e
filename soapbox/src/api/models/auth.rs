//! API request/response models for authentication and password management.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::users::User;

/// Signup request. There is deliberately no role field: every signup
/// creates a regular user, and only an existing admin can promote one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Login request. Both fields are optional so a missing one produces the
/// API's own 400 instead of a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

/// `{"status": "success"}`, with an optional `message`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionData {
    pub user: User,
}

/// Body of every response that establishes a session:
/// `{"status": "success", "token": "<jwt>", "data": {"user": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionEnvelope {
    pub status: String,
    pub token: String,
    pub data: SessionData,
}

impl SessionEnvelope {
    pub fn new(token: String, user: User) -> Self {
        Self {
            status: "success".to_string(),
            token,
            data: SessionData { user },
        }
    }
}

/// A session envelope plus the `Set-Cookie` header that delivers the token
/// to browser clients. API clients read the token from the body instead.
#[derive(Debug)]
pub struct SessionResponse {
    pub status_code: StatusCode,
    pub envelope: SessionEnvelope,
    pub cookie: String,
}

impl SessionResponse {
    pub fn new(status_code: StatusCode, token: String, user: User, cookie: String) -> Self {
        Self {
            status_code,
            envelope: SessionEnvelope::new(token, user),
            cookie,
        }
    }
}

impl IntoResponse for SessionResponse {
    fn into_response(self) -> Response {
        (self.status_code, [(header::SET_COOKIE, self.cookie)], Json(self.envelope)).into_response()
    }
}

/// A plain status body plus a cookie mutation (used by logout).
#[derive(Debug)]
pub struct CookieStatusResponse {
    pub body: StatusResponse,
    pub cookie: String,
}

impl IntoResponse for CookieStatusResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::SET_COOKIE, self.cookie)], Json(self.body)).into_response()
    }
}
