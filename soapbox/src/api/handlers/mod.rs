//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication and authorization checks
//! - Business logic execution via database repositories
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Signup, login, logout, and the password reset flow
//! - [`users`]: Profile management plus admin user CRUD
//! - [`posts`]: Community report CRUD, the archive, and monthly statistics
//!
//! # Authentication
//!
//! Protected handlers take the [`crate::api::models::users::CurrentUser`]
//! extractor, which resolves the session token from the `Authorization`
//! header or the session cookie. Admin-only routes are additionally wrapped
//! in [`crate::auth::middleware::require_admin`] at the router level.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error responses.

pub mod auth;
pub mod posts;
pub mod users;
