//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection or transaction, provides
//! strongly-typed CRUD operations, handles query construction and parameter
//! binding, and returns models from [`crate::db::models`].
//!
//! # Common Pattern
//!
//! ```ignore
//! use soapbox::db::handlers::{Repository, Users};
//!
//! async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = Users::new(&mut tx);
//!     let users = repo.list(&Default::default()).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod posts;
pub mod repository;
pub mod users;

pub use posts::Posts;
pub use repository::Repository;
pub use users::Users;
