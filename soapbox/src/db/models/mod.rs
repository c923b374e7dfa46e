//! Database record models matching table schemas.
//!
//! Struct definitions that correspond directly to database table rows.
//! Repositories use these to return query results and accept insertion/update
//! data. Database models are distinct from API models so storage and API
//! representations can evolve independently; conversions live on the API side
//! (`From<UserDBResponse> for User` and friends).
//!
//! - [`users`]: accounts, credentials and the password reset fields
//! - [`posts`]: community issue reports

pub mod posts;
pub mod users;
