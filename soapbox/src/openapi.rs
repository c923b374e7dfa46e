//! OpenAPI documentation for the management API at `/api/v1/*`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Security scheme for session-authenticated endpoints.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session_token".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token issued by `/api/v1/users/login`. Browsers receive it \
                            as an HttpOnly cookie and send it back automatically; other clients \
                            pass it in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_SESSION_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        // Authentication
        api::handlers::auth::signup,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::forgot_password,
        api::handlers::auth::reset_password,
        api::handlers::auth::update_password,
        // Users
        api::handlers::users::get_user_info,
        api::handlers::users::get_me,
        api::handlers::users::update_me,
        api::handlers::users::list_users,
        api::handlers::users::create_user_stub,
        api::handlers::users::get_user,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        // Posts
        api::handlers::posts::list_posts,
        api::handlers::posts::get_post,
        api::handlers::posts::monthly_stats,
        api::handlers::posts::create_post,
        api::handlers::posts::update_post,
        api::handlers::posts::soft_delete_post,
        api::handlers::posts::get_archive,
        api::handlers::posts::restore_post,
        api::handlers::posts::hard_delete_post,
    ),
    components(
        schemas(
            // Authentication
            api::models::auth::SignupRequest,
            api::models::auth::LoginRequest,
            api::models::auth::ForgotPasswordRequest,
            api::models::auth::ResetPasswordRequest,
            api::models::auth::UpdatePasswordRequest,
            api::models::auth::StatusResponse,
            api::models::auth::SessionData,
            api::models::auth::SessionEnvelope,
            // Users
            api::models::users::Role,
            api::models::users::User,
            api::models::users::UserUpdate,
            api::models::users::UpdateMeRequest,
            api::models::users::UserData,
            api::models::users::UserEnvelope,
            api::models::users::UserListData,
            api::models::users::UserListEnvelope,
            api::models::users::CurrentUserData,
            api::models::users::CurrentUserEnvelope,
            // Posts
            api::models::posts::Category,
            api::models::posts::PostCreate,
            api::models::posts::PostUpdate,
            api::models::posts::PostAuthor,
            api::models::posts::Post,
            api::models::posts::MonthlyStat,
            api::models::posts::PostData,
            api::models::posts::PostEnvelope,
            api::models::posts::PostListData,
            api::models::posts::PostListEnvelope,
            api::models::posts::MonthlyStatsData,
            api::models::posts::MonthlyStatsEnvelope,
        )
    ),
    tags(
        (name = "authentication", description = "Signup, login and password lifecycle.

Successful signup, login, password reset and password change all establish a
fresh session: the response carries the token both in the body and as an
HttpOnly cookie."),
        (name = "users", description = "Account self-service and user administration.

`/getUserInfo`, `/updateMe` and `/me` operate on the logged-in account;
the collection routes are restricted to admins."),
        (name = "posts", description = "Community issue reports.

Reading is public. Creating requires a session; the author is always the
logged-in user, and posts flagged `anonymous` never reveal who wrote them.
Moderation (editing, archiving, restoring, deleting) is admin-only."),
    ),
    info(
        title = "Soapbox API",
        description = "Community issue reporting: accounts, sessions and moderated posts.

## Authentication

Log in via `POST /api/v1/users/login` to receive a session token. Browsers get
it as an HttpOnly cookie; API clients send it back as a Bearer token.

## Errors

Errors are JSON with a `status` of `fail` (4xx) or `error` (5xx) and a
human-readable `message`:

```json
{
  \"status\": \"fail\",
  \"message\": \"No document found with that ID\"
}
```",
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();

        // Spot-check that the main surfaces made it in
        assert!(json.contains("/api/v1/users/login"));
        assert!(json.contains("/api/v1/users/forgotPassword"));
        assert!(json.contains("/api/v1/posts/monthly-stats/{year}"));
        assert!(json.contains("session_token"));
    }
}
