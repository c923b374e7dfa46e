use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    api::{
        extractors::{Json, Path, Query},
        models::{
            pagination::Pagination,
            users::{CurrentUser, CurrentUserEnvelope, UpdateMeRequest, User, UserEnvelope, UserListEnvelope, UserUpdate},
        },
    },
    auth::current_user::MaybeCurrentUser,
    db::{
        handlers::{Repository, Users, users::UserFilter},
        models::users::UserUpdateDBRequest,
    },
    errors::Error,
    types::UserId,
};

/// Peek at the current session
///
/// Resolution works exactly like the protected routes, except that a session
/// outlived by a password change answers 200 with `currentUser: null` instead
/// of 401. Meant for UI chrome that renders differently for logged-in
/// visitors.
#[utoipa::path(
    get,
    path = "/api/v1/users/getUserInfo",
    tag = "users",
    responses(
        (status = 200, description = "Current user, or null when the password changed after login", body = CurrentUserEnvelope),
        (status = 401, description = "Not logged in"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_user_info(MaybeCurrentUser(user): MaybeCurrentUser) -> Json<CurrentUserEnvelope> {
    Json(CurrentUserEnvelope::new(user.map(User::from)))
}

/// Get the logged-in user's own profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Own profile", body = UserEnvelope),
        (status = 401, description = "Not logged in"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_me(current_user: CurrentUser) -> Json<UserEnvelope> {
    Json(UserEnvelope::new(User::from(current_user)))
}

/// Update the logged-in user's own name and email
///
/// Everything else in the body is ignored; passwords are explicitly
/// rejected so they cannot sneak past the current-password check on
/// `/updateMyPassword`.
#[utoipa::path(
    patch,
    path = "/api/v1/users/updateMe",
    request_body = UpdateMeRequest,
    tag = "users",
    responses(
        (status = 200, description = "Updated profile", body = UserEnvelope),
        (status = 400, description = "Password update attempted here"),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "Email already in use"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<UpdateMeRequest>,
) -> Result<Json<UserEnvelope>, Error> {
    if request.password.is_some() || request.password_confirm.is_some() {
        return Err(Error::BadRequest {
            message: "This route is not for password updates. Please use /updateMyPassword.".to_string(),
        });
    }

    // Allow-list: only name and email ever make it into the update
    let update = UserUpdateDBRequest {
        name: request.name,
        email: request.email.map(|e| e.trim().to_lowercase()),
        role: None,
        photo: None,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);
    let updated = user_repo.update(current_user.id, &update).await?;

    Ok(Json(UserEnvelope::new(User::from(updated))))
}

/// List all users (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(Pagination),
    responses(
        (status = 200, description = "Paginated list of users", body = UserListEnvelope),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, Query(pagination): Query<Pagination>) -> Result<Json<UserListEnvelope>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let users = user_repo.list(&UserFilter::new(pagination.skip(), pagination.limit())).await?;

    Ok(Json(UserListEnvelope::new(users.into_iter().map(User::from).collect())))
}

/// Stub: accounts are only created through signup
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 500, description = "Always; this route is a deliberate stub"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user_stub() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "status": "error",
            "message": "This route is not defined! Please use /signup",
        })),
    )
        .into_response()
}

/// Get a user by id (admin)
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(
        ("id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "The user", body = UserEnvelope),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<UserEnvelope>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "user".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(UserEnvelope::new(User::from(user))))
}

/// Update a user by id (admin)
///
/// Admins can change name, email, role, and photo. Passwords never go
/// through this route.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    request_body = UserUpdate,
    tag = "users",
    params(
        ("id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Updated user", body = UserEnvelope),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Email already in use"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(request): Json<UserUpdate>,
) -> Result<Json<UserEnvelope>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let updated = user_repo.update(id, &request.into()).await?;

    Ok(Json(UserEnvelope::new(User::from(updated))))
}

/// Delete a user by id (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(
        ("id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<StatusCode, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    if !user_repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: "user".to_string(),
            id: id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}
