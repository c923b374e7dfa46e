//! Authentication and authorization system.
//!
//! This module provides the full auth stack for the API:
//! - Password hashing and validation (Argon2id)
//! - Stateless JWT sessions delivered as a cookie and in the login response body
//! - Single-use password reset tickets, stored hashed
//! - Extractors and middleware for protecting routes
//!
//! # Authentication
//!
//! Browser and API clients authenticate the same way:
//! - Users sign up or log in with email/password and receive a signed JWT
//! - The token is set as an HTTP-only cookie and echoed in the response body,
//!   so browsers ride the cookie while API clients use `Authorization: Bearer`
//! - The token carries only the user id; role and profile data are re-read
//!   from the database on every request
//! - Changing the password invalidates every token issued before the change
//!
//! # Authorization
//!
//! Access control is role-based with two roles:
//! - **User**: can manage their own profile and create posts
//! - **Admin**: can additionally manage all users and moderate all posts
//!
//! # Modules
//!
//! - [`current_user`]: Extractors for getting the authenticated user in handlers
//! - [`middleware`]: Role-restriction middleware for admin-only route trees
//! - [`password`]: Password hashing and reset ticket generation
//! - [`session`]: JWT session token creation and verification
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use soapbox::api::models::users::CurrentUser;
//! use axum::extract::State;
//!
//! async fn protected_handler(
//!     current_user: CurrentUser,
//!     State(state): State<AppState>,
//! ) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", current_user.name))
//! }
//! ```

pub mod current_user;
pub mod middleware;
pub mod password;
pub mod session;
