//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`extractors`]**: Body/path/query extractors whose rejections use the
//!   error envelope
//!
//! # API Structure
//!
//! The API is divided into two functional areas:
//!
//! - **Users** (`/api/v1/users/*`): Signup, login, password management,
//!   profile updates, and the admin-only user management endpoints
//! - **Posts** (`/api/v1/posts/*`): Public post browsing and statistics,
//!   authenticated post creation, and admin-only moderation (soft delete,
//!   archive, restore)
//!
//! # Response Envelope
//!
//! Successful responses use a `status: "success"` envelope with the payload
//! under `data`; list endpoints additionally carry a `results` count. Errors
//! use `status: "fail"` (4xx) or `status: "error"` (5xx) with a `message`.
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/docs` when the server is running.

pub mod extractors;
pub mod handlers;
pub mod models;
