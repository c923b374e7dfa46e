//! Test utilities for integration testing (available with `test-utils` feature).

use crate::{
    AppState,
    api::models::users::Role,
    auth::password::{Argon2Params, hash_string_with_params},
    config::{Config, EmailTransportConfig},
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserDBResponse},
};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Argon2 parameters weak enough to keep tests fast. Never use outside tests.
pub const TEST_ARGON2_PARAMS: Argon2Params = Argon2Params {
    memory_kib: 1024,
    iterations: 1,
    parallelism: 1,
};

/// The plaintext password every [`create_test_user`] account can log in with.
pub const TEST_PASSWORD: &str = "pass1234";

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("soapbox-test-emails-{}", std::process::id()));

    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };
    config.email.transport = EmailTransportConfig::File {
        path: temp_dir.to_string_lossy().to_string(),
    };
    // Production-strength hashing makes every login test crawl
    config.auth.native.password.argon2_memory_kib = TEST_ARGON2_PARAMS.memory_kib;
    config.auth.native.password.argon2_iterations = TEST_ARGON2_PARAMS.iterations;
    config.auth.native.password.argon2_parallelism = TEST_ARGON2_PARAMS.parallelism;
    // Tests drive the API directly rather than through a browser
    config.auth.native.session.cookie_secure = false;
    config.auth.native.session.cookie_same_site = "lax".to_string();
    config
}

pub fn create_test_state(pool: SqlitePool) -> AppState {
    AppState::builder().db(pool).config(create_test_config()).build()
}

/// Create a user directly in the database, bypassing the signup endpoint.
///
/// The account's password is [`TEST_PASSWORD`].
pub async fn create_test_user(pool: &SqlitePool, role: Role) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let user_id = Uuid::new_v4();
    let name = format!("testuser_{}", user_id.simple());
    let email = format!("{name}@example.com");

    let password_hash = hash_string_with_params(TEST_PASSWORD, Some(TEST_ARGON2_PARAMS)).expect("Failed to hash test password");

    let user_create = UserCreateDBRequest {
        name,
        email,
        password_hash,
        role,
        photo: None,
    };

    users_repo.create(&user_create).await.expect("Failed to create test user")
}
