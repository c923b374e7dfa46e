//! API request and response data models.
//!
//! This module contains the data structures used for HTTP request
//! deserialization and response serialization. These models define the public
//! API contract.
//!
//! # Design Principles
//!
//! - **Separation of Concerns**: API models are distinct from database models,
//!   allowing independent evolution of API and storage representations
//! - **Sanitization**: user responses never carry the password hash or reset
//!   ticket fields; they exist only on the database models
//! - **OpenAPI**: All models are annotated with `utoipa` for automatic API docs
//!
//! # Model Categories
//!
//! - [`auth`]: Signup, login, and password management payloads plus the
//!   session response that delivers the JWT as cookie and body
//! - [`users`]: User roles, sanitized user representations, and update requests
//! - [`posts`]: Post payloads, categories, and the monthly statistics shapes
//! - [`pagination`]: Shared `skip`/`limit` query parameters

pub mod auth;
pub mod pagination;
pub mod posts;
pub mod users;
