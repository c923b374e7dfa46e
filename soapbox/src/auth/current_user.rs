//! Extractors for the authenticated user.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    db::{
        errors::DbError,
        handlers::{Repository, Users},
    },
    errors::{Error, Result},
    types::abbrev_uuid,
};

/// Pull the session token out of the request, if any.
///
/// The `Authorization: Bearer` header wins over the session cookie. A header
/// without the Bearer prefix falls through to the cookie rather than erroring.
fn extract_session_token(parts: &Parts, config: &Config) -> Result<Option<String>> {
    if let Some(auth_header) = parts.headers.get(axum::http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|e| Error::BadRequest {
            message: format!("Invalid authorization header: {e}"),
        })?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(token.to_string()));
        }
    }

    if let Some(cookie_header) = parts.headers.get(axum::http::header::COOKIE) {
        let cookie_str = cookie_header.to_str().map_err(|e| Error::BadRequest {
            message: format!("Invalid cookie header: {e}"),
        })?;
        let cookie_name = &config.auth.native.session.cookie_name;

        for cookie in cookie_str.split(';') {
            let cookie = cookie.trim();
            if let Some((name, value)) = cookie.split_once('=') {
                if name == cookie_name {
                    return Ok(Some(value.to_string()));
                }
            }
        }
    }

    Ok(None)
}

/// Verify a session token and re-resolve the user it belongs to.
///
/// The claims carry only the user id; the database is the source of truth
/// for role and profile data on every request. Yields `None` when the user's
/// password changed after the token was issued; the caller decides whether
/// that rejects the request.
#[instrument(skip_all)]
async fn resolve_session_user(token: &str, state: &AppState) -> Result<Option<CurrentUser>> {
    let claims = session::verify_session_token(token, &state.config)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo.get_by_id(claims.sub).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("The user belonging to the token does not exist anymore".to_string()),
    })?;

    // Tokens minted before the last password change are dead. The comparison
    // is on whole seconds: a token issued in the same second as the change
    // still passes, which keeps the fresh token from updatePassword valid.
    if let Some(changed_at) = user.password_changed_at {
        if changed_at.timestamp() > claims.iat {
            return Ok(None);
        }
    }

    Ok(Some(CurrentUser::from(user)))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = extract_session_token(parts, &state.config)?.ok_or(Error::Unauthenticated { message: None })?;

        let user = resolve_session_user(&token, state).await?.ok_or_else(|| Error::Unauthenticated {
            message: Some("User recently changed password! Please log in again".to_string()),
        })?;
        debug!("Authenticated user: {}", abbrev_uuid(&user.id));
        Ok(user)
    }
}

/// Variant of [`CurrentUser`] for the session peek: resolution runs the same
/// way and still rejects missing or invalid credentials, but a token outlived
/// by a password change resolves to `None` instead of erroring.
#[derive(Debug)]
pub struct MaybeCurrentUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeCurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = extract_session_token(parts, &state.config)?.ok_or(Error::Unauthenticated { message: None })?;

        let user = resolve_session_user(&token, state).await?;
        if user.is_none() {
            trace!("Session token predates a password change, continuing without a user");
        }
        Ok(Self(user))
    }
}
