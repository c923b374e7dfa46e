//! # soapbox: Community Issue Reporting Service
//!
//! `soapbox` is the backend for a community issue-reporting platform. Residents
//! sign up, report problems in their neighbourhood (a broken streetlight, an
//! unsafe crossing, an overflowing bin), and follow what has been fixed, while
//! moderators keep the board tidy. It provides a RESTful API for accounts,
//! sessions and posts, with role-based moderation on top.
//!
//! ## Overview
//!
//! The service exposes two surfaces under `/api/v1`: a **users** area covering
//! signup, login, password recovery and profile self-service (plus admin-only
//! user management), and a **posts** area where reports are browsed publicly,
//! created by logged-in users, and moderated by admins through a soft-delete
//! archive.
//!
//! A few behaviors shape the whole design:
//!
//! - **Stateless sessions**: login issues a signed JWT carrying only the user
//!   id. It is delivered both as an HttpOnly cookie (for browsers) and in the
//!   response body (for API clients sending `Authorization: Bearer`). Profile
//!   and role data are re-read from the database on every request, and changing
//!   a password invalidates every token issued before the change.
//! - **Anonymous posts**: authorship is always recorded, but posts flagged
//!   `anonymous` never reveal their author through the API.
//! - **Soft deletion**: moderators archive posts rather than destroying them;
//!   archived posts vanish from the public surface but can be restored or
//!   permanently deleted from the archive.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the
//! HTTP layer and uses SQLite (via SQLx) for persistence, which keeps a small
//! community deployment to a single file on disk.
//!
//! ### Request Flow
//!
//! A request first passes through the session layer: the `CurrentUser`
//! extractor reads the JWT from the `Authorization` header or the session
//! cookie, verifies the signature and expiry, and loads the account fresh from
//! the database. Admin-only route subtrees are wrapped in middleware that
//! rejects non-admins before any handler runs. Handlers then talk to the
//! database through repository types ([`db::handlers`]) and translate rows
//! into sanitized API models ([`api::models`]); password hashes and reset
//! ticket fields never leave the database layer.
//!
//! ### Core Components
//!
//! - The **API layer** ([`api`]) defines the route handlers and the
//!   request/response models, all annotated for OpenAPI generation.
//! - The **authentication layer** ([`auth`]) covers Argon2id password hashing,
//!   JWT session tokens, single-use password reset tickets (stored hashed),
//!   and the extractors/middleware that protect routes.
//! - The **database layer** ([`db`]) uses the repository pattern over SQLx;
//!   each entity has a repository handling queries and constraint-violation
//!   mapping.
//! - The **email layer** delivers password reset tickets over SMTP or, for
//!   development, into local files.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use soapbox::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = soapbox::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize structured logging
//!     soapbox::telemetry::init_telemetry()?;
//!
//!     // Create and start the application
//!     let app = Application::new(config).await?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations are embedded and run automatically on startup:
//!
//! ```no_run
//! # use sqlx::SqlitePool;
//! # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
//! soapbox::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
mod email;
pub mod errors;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    api::models::users::Role,
    auth::{middleware::require_admin, password},
    config::CorsOrigin,
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    errors::Error,
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    extract::OriginalUri,
    http::{self, HeaderName, HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};
use bon::Builder;
pub use config::Config;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{PostId, UserId};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the soapbox database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: a missing admin account is created, an existing one gets its
/// password updated to the configured value. Returns `None` when no password
/// is configured and no account exists yet, since an account without a
/// password could never log in.
///
/// The password update deliberately does not touch `password_changed_at`, so
/// rotating the bootstrap password in config does not log the admin out
/// everywhere on the next restart.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &SqlitePool) -> Result<Option<UserId>, Error> {
    let email = email.trim().to_lowercase();

    // Hash password if provided
    let password_hash = password.map(password::hash_string).transpose()?;

    // Use a transaction to ensure atomicity
    let mut tx = db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    // Check if user already exists
    if let Some(existing_user) = user_repo.get_user_by_email(&email).await? {
        if let Some(password_hash) = password_hash {
            sqlx::query("UPDATE users SET password_hash = ? WHERE email = ?")
                .bind(&password_hash)
                .bind(&email)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Database(e.into()))?;
        }
        tx.commit().await.map_err(|e| Error::Database(e.into()))?;
        return Ok(Some(existing_user.id));
    }

    let Some(password_hash) = password_hash else {
        info!("No admin password configured, skipping initial admin user creation");
        return Ok(None);
    };

    let user_create = UserCreateDBRequest {
        name: "Admin".to_string(),
        email: email.clone(),
        password_hash,
        role: Role::Admin,
        photo: None,
    };

    let created_user = user_repo.create(&user_create).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!("Created initial admin user {}", email);
    Ok(Some(created_user.id))
}

/// Connect to the database, run migrations, and seed the admin account
async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;

    create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    // The frontend lives on another origin, so preflighted PATCH/DELETE with
    // cookies has to be spelled out
    let mut exposed_headers = vec![http::header::LOCATION];
    for name in &config.auth.security.cors.exposed_headers {
        exposed_headers.push(name.parse::<HeaderName>()?);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .expose_headers(exposed_headers);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// 404 fallback for routes nothing matched
async fn unknown_route(OriginalUri(uri): OriginalUri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "fail",
            "message": format!("Can't find {uri} on this server"),
        })),
    )
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Account routes (signup, login, password reset, profile self-service)
/// - Admin routes for user management and post moderation
/// - Public post browsing and statistics
/// - OpenAPI document and Scalar UI at `/docs`
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;

    // Admin-only user management; the middleware authenticates and rejects
    // non-admins before any handler runs
    let admin_user_routes = Router::new()
        .route("/", get(api::handlers::users::list_users).post(api::handlers::users::create_user_stub))
        .route(
            "/{id}",
            get(api::handlers::users::get_user)
                .patch(api::handlers::users::update_user)
                .delete(api::handlers::users::delete_user),
        )
        .layer(from_fn_with_state(state.clone(), require_admin));

    let user_routes = Router::new()
        .route("/signup", post(api::handlers::auth::signup))
        .route("/login", post(api::handlers::auth::login))
        .route("/logout", post(api::handlers::auth::logout))
        .route("/forgotPassword", post(api::handlers::auth::forgot_password))
        .route("/resetPassword/{token}", patch(api::handlers::auth::reset_password))
        .route("/updateMyPassword", patch(api::handlers::auth::update_password))
        .route("/getUserInfo", get(api::handlers::users::get_user_info))
        .route("/me", get(api::handlers::users::get_me))
        .route("/updateMe", patch(api::handlers::users::update_me))
        .merge(admin_user_routes)
        .with_state(state.clone());

    // Moderation routes with no public counterpart on the same path
    let admin_post_routes = Router::new()
        .route("/softDelete/{id}", delete(api::handlers::posts::soft_delete_post))
        .route("/archive", get(api::handlers::posts::get_archive))
        .route(
            "/archive/{id}",
            patch(api::handlers::posts::restore_post).delete(api::handlers::posts::hard_delete_post),
        )
        .layer(from_fn_with_state(state.clone(), require_admin));

    // GET /{id} is public while PATCH /{id} is moderation, so the admin gate
    // goes on the method router rather than the path
    let post_routes = Router::new()
        .route(
            "/",
            get(api::handlers::posts::list_posts).post(api::handlers::posts::create_post),
        )
        .route("/monthly-stats/{year}", get(api::handlers::posts::monthly_stats))
        .route(
            "/{id}",
            get(api::handlers::posts::get_post).merge(
                patch(api::handlers::posts::update_post).route_layer(from_fn_with_state(state.clone(), require_admin)),
            ),
        )
        .merge(admin_post_routes)
        .with_state(state);

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1/users", user_routes)
        .nest("/api/v1/posts", post_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .route("/docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .fallback(unknown_route);

    // Add tracing layer
    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, seeds the initial admin account, and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts
///    handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests
///    drain and the database pool closes
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create an application on an existing pool (used by tests, where the
    /// pool comes from the harness rather than config)
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        debug!("Starting soapbox with configuration: {:#?}", config);

        migrator().run(&pool).await?;
        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Soapbox listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        // Close database connections
        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
