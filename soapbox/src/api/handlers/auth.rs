use axum::{extract::State, http::StatusCode};
use chrono::Utc;

use crate::{
    AppState,
    api::{
        extractors::{Json, Path},
        models::{
            auth::{
                CookieStatusResponse, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SessionEnvelope, SessionResponse,
                SignupRequest, StatusResponse, UpdatePasswordRequest,
            },
            users::{CurrentUser, Role, User},
        },
    },
    auth::{password, session},
    config::{Config, PasswordConfig},
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
    email::EmailService,
    errors::Error,
};

/// Create a new account
///
/// Every account created here gets the `user` role; there is no way to
/// request a different one through this endpoint.
#[utoipa::path(
    post,
    path = "/api/v1/users/signup",
    request_body = SignupRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Account created and logged in", body = SessionEnvelope),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "An account with this email already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signup(State(state): State<AppState>, Json(request): Json<SignupRequest>) -> Result<SessionResponse, Error> {
    if !state.config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    let password_config = &state.config.auth.native.password;
    validate_password(&request.password, &request.password_confirm, password_config)?;

    let password_hash = hash_password(request.password.clone(), password_config).await?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    // Duplicate emails surface as a unique violation from the insert itself,
    // which the error layer maps to a 409. No pre-check, so two concurrent
    // signups for the same address cannot both slip through.
    let created_user = user_repo
        .create(&UserCreateDBRequest {
            name: request.name,
            email: request.email.to_lowercase(),
            password_hash,
            role: Role::User,
            photo: None,
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    establish_session(StatusCode::CREATED, created_user, &state.config)
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = SessionEnvelope),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<SessionResponse, Error> {
    let (email, password) = match (request.email.as_deref(), request.password.as_deref()) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => (email, password),
        _ => {
            return Err(Error::BadRequest {
                message: "Please provide email and password!".to_string(),
            });
        }
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    // Unknown email and wrong password are indistinguishable to the caller
    let user = user_repo
        .get_user_by_email(&email.to_lowercase())
        .await?
        .ok_or(Error::InvalidCredentials { message: None })?;

    let is_valid = verify_password(password.to_string(), user.password_hash.clone()).await?;
    if !is_valid {
        return Err(Error::InvalidCredentials { message: None });
    }

    establish_session(StatusCode::OK, user, &state.config)
}

/// Logout (clear the session cookie)
///
/// Tokens are stateless, so an already-issued token stays valid until its
/// natural expiry; this only removes the browser's copy.
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Session cookie cleared", body = StatusResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<CookieStatusResponse, Error> {
    Ok(CookieStatusResponse {
        body: StatusResponse::success(),
        cookie: create_logout_cookie(&state.config),
    })
}

/// Request a password reset email
#[utoipa::path(
    post,
    path = "/api/v1/users/forgotPassword",
    request_body = ForgotPasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Reset email sent", body = StatusResponse),
        (status = 404, description = "No account with that email"),
        (status = 500, description = "Email could not be sent"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<StatusResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "email".to_string(),
            id: request.email.clone(),
        })?;

    // Only the digest is stored. A fresh request overwrites any outstanding
    // ticket, so at most one ticket is live per account.
    let raw_token = password::generate_reset_token();
    let token_hash = password::hash_reset_token(&raw_token);
    let ttl = chrono::Duration::from_std(state.config.auth.native.password_reset_token_duration).map_err(|e| Error::Internal {
        operation: format!("compute reset ticket expiry: {e}"),
    })?;
    user_repo.set_password_reset(user.id, &token_hash, Utc::now() + ttl).await?;

    // The raw ticket goes out in the email and nowhere else. If sending
    // fails, clear the ticket fields again so the account is not left
    // holding a ticket nobody ever received.
    let email_sent = match EmailService::new(&state.config) {
        Ok(service) => service.send_password_reset_email(&user.email, &user.name, &raw_token).await,
        Err(err) => Err(err),
    };
    if let Err(err) = email_sent {
        user_repo.clear_password_reset(user.id).await?;
        return Err(err);
    }

    Ok(Json(StatusResponse::with_message("Token sent to email")))
}

/// Reset a password with an emailed ticket
#[utoipa::path(
    patch,
    path = "/api/v1/users/resetPassword/{token}",
    request_body = ResetPasswordRequest,
    params(
        ("token" = String, Path, description = "Raw reset ticket from the email"),
    ),
    tag = "authentication",
    responses(
        (status = 200, description = "Password reset, caller logged in", body = SessionEnvelope),
        (status = 400, description = "Ticket invalid or expired, or invalid password"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<SessionResponse, Error> {
    let password_config = &state.config.auth.native.password;
    validate_password(&request.password, &request.password_confirm, password_config)?;

    let new_password_hash = hash_password(request.password.clone(), password_config).await?;
    let token_hash = password::hash_reset_token(&token);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    // Single conditional update: of any number of concurrent presentations
    // of the same ticket, exactly one consumes it.
    let user = user_repo
        .consume_password_reset(&token_hash, &new_password_hash)
        .await?
        .ok_or(Error::TokenInvalidOrExpired)?;

    establish_session(StatusCode::OK, user, &state.config)
}

/// Change the password of the logged-in user
#[utoipa::path(
    patch,
    path = "/api/v1/users/updateMyPassword",
    request_body = UpdatePasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed, fresh session issued", body = SessionEnvelope),
        (status = 400, description = "Invalid new password"),
        (status = 401, description = "Current password is wrong"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<SessionResponse, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    // Re-fetch for the stored hash; the extractor's user is sanitized
    let user = user_repo.get_by_id(current_user.id).await?.ok_or(Error::Unauthenticated {
        message: Some("The user belonging to the token does not exist anymore".to_string()),
    })?;

    let is_valid = verify_password(request.password_current.clone(), user.password_hash.clone()).await?;
    if !is_valid {
        return Err(Error::InvalidCredentials {
            message: Some("Your current password is wrong".to_string()),
        });
    }

    let password_config = &state.config.auth.native.password;
    validate_password(&request.password, &request.password_confirm, password_config)?;

    let new_password_hash = hash_password(request.password.clone(), password_config).await?;
    let updated = user_repo.update_password(current_user.id, &new_password_hash, Utc::now()).await?;

    // The fresh token is issued after password_changed_at is stamped, so its
    // iat lands in the same second or later and survives the stale check.
    establish_session(StatusCode::OK, updated, &state.config)
}

/// Issue a session token for `user` and package it the way every auth
/// endpoint answers: token + cookie + sanitized user.
fn establish_session(status_code: StatusCode, user: UserDBResponse, config: &Config) -> Result<SessionResponse, Error> {
    let token = session::create_session_token(user.id, config)?;
    let cookie = create_session_cookie(&token, config);
    Ok(SessionResponse::new(status_code, token, User::from(user), cookie))
}

fn validate_password(password: &str, password_confirm: &str, config: &PasswordConfig) -> Result<(), Error> {
    if password.len() < config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", config.min_length),
        });
    }
    if password.len() > config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", config.max_length),
        });
    }
    if password != password_confirm {
        return Err(Error::BadRequest {
            message: "Passwords are not the same!".to_string(),
        });
    }
    Ok(())
}

/// Hash a password on a blocking thread to avoid stalling the async runtime.
async fn hash_password(password: String, config: &PasswordConfig) -> Result<String, Error> {
    let params = password::Argon2Params {
        memory_kib: config.argon2_memory_kib,
        iterations: config.argon2_iterations,
        parallelism: config.argon2_parallelism,
    };
    tokio::task::spawn_blocking(move || password::hash_string_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Verify a password on a blocking thread to avoid stalling the async runtime.
async fn verify_password(password: String, hash: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })
}

fn create_session_cookie(token: &str, config: &Config) -> String {
    let session_config = &config.auth.native.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session_config.cookie_name,
        token,
        session_config.cookie_same_site,
        session_config.cookie_expiry.as_secs()
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn create_logout_cookie(config: &Config) -> String {
    let session_config = &config.auth.native.session;
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        session_config.cookie_name, session_config.cookie_same_site
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
