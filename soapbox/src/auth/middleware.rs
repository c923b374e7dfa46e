//! Route protection middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::trace;

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    errors::Error,
};

/// Pure role check shared by the middleware and anything else that needs it.
pub fn require_role(user: &CurrentUser, allowed: &[Role]) -> Result<(), Error> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

/// Implementation for [`require_admin`]. Authenticates the request and
/// rejects non-admins, returning the untouched request on success so the
/// middleware can pass it along.
pub(crate) async fn authorize_admin(state: AppState, request: Request) -> Result<Request, Error> {
    let (mut parts, body) = request.into_parts();
    let current_user = CurrentUser::from_request_parts(&mut parts, &state).await?;

    require_role(&current_user, &[Role::Admin])?;
    trace!("Admin access granted: {}", current_user.email);

    Ok(Request::from_parts(parts, body))
}

/// Middleware restricting a route subtree to admin users.
///
/// Layered with `axum::middleware::from_fn_with_state` on admin routers, so
/// the handlers behind it stay free of role checks.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let request = authorize_admin(state, request).await?;
    Ok(next.run(request).await)
}
