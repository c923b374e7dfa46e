use axum::{extract::State, http::StatusCode};
use sqlx::SqliteConnection;

use crate::{
    AppState,
    api::{
        extractors::{Json, Path, Query},
        models::{
            pagination::Pagination,
            posts::{ListPostsQuery, MonthlyStat, MonthlyStatsEnvelope, Post, PostAuthor, PostCreate, PostEnvelope, PostListEnvelope,
                PostUpdate, slugify},
            users::CurrentUser,
        },
    },
    db::{
        handlers::{Posts, Repository, Users, posts::PostFilter},
        models::posts::{PostCreateDBRequest, PostDBResponse, PostUpdateDBRequest},
    },
    errors::Error,
    types::{PostId, UserId},
};

/// List public posts
///
/// Soft-deleted posts are excluded; anonymous posts come back without
/// their author.
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "posts",
    params(ListPostsQuery),
    responses(
        (status = 200, description = "Paginated list of posts", body = PostListEnvelope),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_posts(State(state): State<AppState>, Query(query): Query<ListPostsQuery>) -> Result<Json<PostListEnvelope>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let filter = PostFilter {
        skip: query.pagination.skip(),
        limit: query.pagination.limit(),
        category: query.category,
        solved: query.solved,
        archived: false,
    };
    let mut post_repo = Posts::new(&mut conn);
    let posts = post_repo.list(&filter).await?;

    let posts = attribute_posts(&mut conn, posts).await?;
    Ok(Json(PostListEnvelope::new(posts)))
}

/// Get a single post
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    params(
        ("id" = uuid::Uuid, Path, description = "Post ID"),
    ),
    responses(
        (status = 200, description = "The post", body = PostEnvelope),
        (status = 404, description = "Missing or soft-deleted post"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_post(State(state): State<AppState>, Path(id): Path<PostId>) -> Result<Json<PostEnvelope>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut post_repo = Posts::new(&mut conn);

    // A soft-deleted post is indistinguishable from a missing one out here
    let post = post_repo
        .get_by_id(id)
        .await?
        .filter(|post| !post.deleted)
        .ok_or_else(|| Error::NotFound {
            resource: "post".to_string(),
            id: id.to_string(),
        })?;

    let post = attribute_post(&mut conn, post).await?;
    Ok(Json(PostEnvelope::new(post)))
}

/// Per-month post activity for one calendar year
///
/// Months with no posts are absent; the busiest month comes first.
#[utoipa::path(
    get,
    path = "/api/v1/posts/monthly-stats/{year}",
    tag = "posts",
    params(
        ("year" = i32, Path, description = "Calendar year, e.g. 2025"),
    ),
    responses(
        (status = 200, description = "Per-month counts and titles", body = MonthlyStatsEnvelope),
        (status = 400, description = "Year out of range"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn monthly_stats(State(state): State<AppState>, Path(year): Path<i32>) -> Result<Json<MonthlyStatsEnvelope>, Error> {
    if !(1970..=9999).contains(&year) {
        return Err(Error::BadRequest {
            message: "Year must be between 1970 and 9999".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut post_repo = Posts::new(&mut conn);

    let stats = post_repo.monthly_stats(year).await?;
    Ok(Json(MonthlyStatsEnvelope::new(stats.into_iter().map(MonthlyStat::from).collect())))
}

/// Create a post
///
/// The author is always the logged-in user; `anonymous` only controls
/// whether that attribution is shown, not whether it is stored.
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = PostCreate,
    tag = "posts",
    responses(
        (status = 201, description = "Created post", body = PostEnvelope),
        (status = 400, description = "Invalid title or description"),
        (status = 401, description = "Not logged in"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_post(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PostCreate>,
) -> Result<(StatusCode, Json<PostEnvelope>), Error> {
    let title = request.title.trim().to_string();
    validate_title(&title)?;
    let description = request.description.trim().to_string();
    if description.is_empty() {
        return Err(Error::BadRequest {
            message: "Description must not be empty".to_string(),
        });
    }

    let slug = slugify(&title);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut post_repo = Posts::new(&mut conn);
    let created = post_repo
        .create(&PostCreateDBRequest {
            title,
            slug,
            description,
            category: request.category,
            images: request.images,
            author_id: current_user.id,
            anonymous: request.anonymous,
        })
        .await?;

    // The author is the caller, so no lookup is needed
    let author = PostAuthor {
        name: current_user.name,
        photo: current_user.photo,
    };
    let post = Post::from_db(created, Some(author));
    Ok((StatusCode::CREATED, Json(PostEnvelope::new(post))))
}

/// Update a post (admin)
#[utoipa::path(
    patch,
    path = "/api/v1/posts/{id}",
    request_body = PostUpdate,
    tag = "posts",
    params(
        ("id" = uuid::Uuid, Path, description = "Post ID"),
    ),
    responses(
        (status = 200, description = "Updated post", body = PostEnvelope),
        (status = 400, description = "Invalid title or description"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such post"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    Json(request): Json<PostUpdate>,
) -> Result<Json<PostEnvelope>, Error> {
    let title = request.title.map(|t| t.trim().to_string());
    if let Some(title) = &title {
        validate_title(title)?;
    }
    let description = request.description.map(|d| d.trim().to_string());
    if description.as_deref().is_some_and(str::is_empty) {
        return Err(Error::BadRequest {
            message: "Description must not be empty".to_string(),
        });
    }

    // A new title means a new slug
    let slug = title.as_deref().map(slugify);

    let update = PostUpdateDBRequest {
        title,
        slug,
        description,
        category: request.category,
        images: request.images,
        anonymous: request.anonymous,
        solved: request.solved,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut post_repo = Posts::new(&mut conn);
    let updated = post_repo.update(id, &update).await?;

    let post = attribute_post(&mut conn, updated).await?;
    Ok(Json(PostEnvelope::new(post)))
}

/// Move a post to the archive (admin)
///
/// The post disappears from public listings but keeps its row; restore
/// brings it back.
#[utoipa::path(
    delete,
    path = "/api/v1/posts/softDelete/{id}",
    tag = "posts",
    params(
        ("id" = uuid::Uuid, Path, description = "Post ID"),
    ),
    responses(
        (status = 200, description = "Archived post", body = PostEnvelope),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such post"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn soft_delete_post(State(state): State<AppState>, Path(id): Path<PostId>) -> Result<Json<PostEnvelope>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut post_repo = Posts::new(&mut conn);

    let archived = post_repo.soft_delete(id).await?;

    let post = attribute_post(&mut conn, archived).await?;
    Ok(Json(PostEnvelope::new(post)))
}

/// List archived posts (admin)
#[utoipa::path(
    get,
    path = "/api/v1/posts/archive",
    tag = "posts",
    params(Pagination),
    responses(
        (status = 200, description = "Paginated list of archived posts", body = PostListEnvelope),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_archive(State(state): State<AppState>, Query(pagination): Query<Pagination>) -> Result<Json<PostListEnvelope>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let filter = PostFilter {
        skip: pagination.skip(),
        limit: pagination.limit(),
        category: None,
        solved: None,
        archived: true,
    };
    let mut post_repo = Posts::new(&mut conn);
    let posts = post_repo.list(&filter).await?;

    let posts = attribute_posts(&mut conn, posts).await?;
    Ok(Json(PostListEnvelope::new(posts)))
}

/// Restore a post from the archive (admin)
#[utoipa::path(
    patch,
    path = "/api/v1/posts/archive/{id}",
    tag = "posts",
    params(
        ("id" = uuid::Uuid, Path, description = "Post ID"),
    ),
    responses(
        (status = 200, description = "Restored post", body = PostEnvelope),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such post"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn restore_post(State(state): State<AppState>, Path(id): Path<PostId>) -> Result<Json<PostEnvelope>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut post_repo = Posts::new(&mut conn);

    let restored = post_repo.restore(id).await?;

    let post = attribute_post(&mut conn, restored).await?;
    Ok(Json(PostEnvelope::new(post)))
}

/// Permanently delete a post (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/posts/archive/{id}",
    tag = "posts",
    params(
        ("id" = uuid::Uuid, Path, description = "Post ID"),
    ),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such post"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn hard_delete_post(State(state): State<AppState>, Path(id): Path<PostId>) -> Result<StatusCode, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut post_repo = Posts::new(&mut conn);

    if !post_repo.delete(id).await? {
        return Err(Error::NotFound {
            resource: "post".to_string(),
            id: id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}

fn validate_title(title: &str) -> Result<(), Error> {
    let length = title.chars().count();
    if length < 8 {
        return Err(Error::BadRequest {
            message: "Title must be at least 8 characters".to_string(),
        });
    }
    if length > 32 {
        return Err(Error::BadRequest {
            message: "Title must be no more than 32 characters".to_string(),
        });
    }
    Ok(())
}

/// Resolve author attribution for a batch of posts. Anonymous posts never
/// get an author; for the rest, a missing author row (deleted account)
/// degrades to no attribution rather than an error.
async fn attribute_posts(conn: &mut SqliteConnection, posts: Vec<PostDBResponse>) -> Result<Vec<Post>, Error> {
    let mut author_ids: Vec<UserId> = posts.iter().filter(|post| !post.anonymous).map(|post| post.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut user_repo = Users::new(conn);
    let authors = user_repo.get_bulk(author_ids).await?;

    Ok(posts
        .into_iter()
        .map(|post| {
            let author = authors.get(&post.author_id).map(|user| PostAuthor {
                name: user.name.clone(),
                photo: user.photo.clone(),
            });
            Post::from_db(post, author)
        })
        .collect())
}

async fn attribute_post(conn: &mut SqliteConnection, post: PostDBResponse) -> Result<Post, Error> {
    let author = if post.anonymous {
        None
    } else {
        let mut user_repo = Users::new(conn);
        user_repo.get_by_id(post.author_id).await?.map(|user| PostAuthor {
            name: user.name,
            photo: user.photo,
        })
    };
    Ok(Post::from_db(post, author))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::users::Role,
        auth::session,
        test_utils::{create_test_state, create_test_user},
    };
    use axum_test::TestServer;
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use sqlx::SqlitePool;
    use uuid::Uuid;

    fn test_router(state: AppState) -> axum::Router {
        // Admin routes are registered bare here; the role gate itself is
        // covered by the middleware tests
        axum::Router::new()
            .route("/", axum::routing::get(list_posts).post(create_post))
            .route("/monthly-stats/{year}", axum::routing::get(monthly_stats))
            .route("/softDelete/{id}", axum::routing::delete(soft_delete_post))
            .route("/archive", axum::routing::get(get_archive))
            .route("/archive/{id}", axum::routing::patch(restore_post).delete(hard_delete_post))
            .route("/{id}", axum::routing::get(get_post).patch(update_post))
            .with_state(state)
    }

    async fn server_and_token(pool: SqlitePool, role: Role) -> (TestServer, String) {
        let state = create_test_state(pool.clone());
        let user = create_test_user(&pool, role).await;
        let token = session::create_session_token(user.id, &state.config).unwrap();
        (TestServer::new(test_router(state)).unwrap(), token)
    }

    async fn create_post_via_api(server: &TestServer, token: &str, title: &str, body: Value) -> Value {
        let mut request = json!({
            "title": title,
            "description": "Something is broken around here",
            "category": "infrastructure",
        });
        request.as_object_mut().unwrap().extend(body.as_object().unwrap().clone());
        let response = server.post("/").authorization_bearer(token).json(&request).await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_post(pool: SqlitePool) {
        let state = create_test_state(pool.clone());
        let user = create_test_user(&pool, Role::User).await;
        let token = session::create_session_token(user.id, &state.config).unwrap();
        let server = TestServer::new(test_router(state)).unwrap();

        let response = server
            .post("/")
            .authorization_bearer(&token)
            .json(&json!({
                "title": "  Broken streetlight on 5th Ave!  ",
                "description": "It has been dark for a week",
                "category": "infrastructure",
                "images": ["street.jpg"],
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["status"], "success");
        let post = &body["data"]["post"];
        assert_eq!(post["title"], "Broken streetlight on 5th Ave!");
        assert_eq!(post["slug"], "broken-streetlight-on-5th-ave");
        assert_eq!(post["category"], "infrastructure");
        assert_eq!(post["author"]["name"], user.name);
        assert_eq!(post["solved"], false);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_post_requires_login(pool: SqlitePool) {
        let server = TestServer::new(test_router(create_test_state(pool))).unwrap();

        let response = server
            .post("/")
            .json(&json!({
                "title": "A post without a session",
                "description": "Should not exist",
                "category": "other",
            }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_post_validates_title(pool: SqlitePool) {
        let (server, token) = server_and_token(pool, Role::User).await;

        let short = server
            .post("/")
            .authorization_bearer(&token)
            .json(&json!({"title": "short", "description": "x y z", "category": "other"}))
            .await;
        short.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = short.json();
        assert_eq!(body["message"], "Title must be at least 8 characters");

        let long_title = "x".repeat(33);
        let long = server
            .post("/")
            .authorization_bearer(&token)
            .json(&json!({"title": long_title, "description": "x y z", "category": "other"}))
            .await;
        long.assert_status(StatusCode::BAD_REQUEST);

        // Whitespace does not count towards the length
        let padded = server
            .post("/")
            .authorization_bearer(&token)
            .json(&json!({"title": "      ab      ", "description": "x y z", "category": "other"}))
            .await;
        padded.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_hides_anonymous_authors_and_deleted_posts(pool: SqlitePool) {
        let (server, token) = server_and_token(pool.clone(), Role::Admin).await;

        create_post_via_api(&server, &token, "A perfectly public post", json!({})).await;
        let anonymous = create_post_via_api(&server, &token, "An anonymous complaint", json!({"anonymous": true})).await;
        let buried = create_post_via_api(&server, &token, "A soon-deleted post", json!({})).await;

        // Creation answers the author to everyone but hides it when anonymous
        assert_eq!(anonymous["data"]["post"]["author"], Value::Null);
        assert_eq!(anonymous["data"]["post"]["anonymous"], true);

        let buried_id = buried["data"]["post"]["id"].as_str().unwrap().to_string();
        server
            .delete(&format!("/softDelete/{buried_id}"))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let listed = server.get("/").await;
        listed.assert_status_ok();
        let body: Value = listed.json();
        assert_eq!(body["results"], 2);
        let posts = body["data"]["posts"].as_array().unwrap();
        for post in posts {
            assert_ne!(post["id"], Value::String(buried_id.clone()));
            if post["anonymous"] == true {
                assert_eq!(post["author"], Value::Null);
            } else {
                assert!(post["author"]["name"].is_string());
                assert!(post["author"]["photo"].is_string());
            }
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_pagination(pool: SqlitePool) {
        let (server, token) = server_and_token(pool, Role::User).await;

        create_post_via_api(&server, &token, "Dangerous crossing on Elm", json!({"category": "safety"})).await;
        create_post_via_api(&server, &token, "Overflowing bins again", json!({"category": "environment"})).await;
        let solved = create_post_via_api(&server, &token, "Pothole on Main Street", json!({"category": "infrastructure"})).await;

        // Flag one as solved through the admin update
        let solved_id = solved["data"]["post"]["id"].as_str().unwrap();
        server
            .patch(&format!("/{solved_id}"))
            .authorization_bearer(&token)
            .json(&json!({"solved": true}))
            .await
            .assert_status_ok();

        let by_category = server.get("/").add_query_param("category", "safety").await;
        let body: Value = by_category.json();
        assert_eq!(body["results"], 1);
        assert_eq!(body["data"]["posts"][0]["category"], "safety");

        let by_solved = server.get("/").add_query_param("solved", "true").await;
        let body: Value = by_solved.json();
        assert_eq!(body["results"], 1);
        assert_eq!(body["data"]["posts"][0]["solved"], true);

        let paged = server.get("/").add_query_param("limit", "2").await;
        let body: Value = paged.json();
        assert_eq!(body["results"], 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_post(pool: SqlitePool) {
        let (server, token) = server_and_token(pool, Role::Admin).await;

        let created = create_post_via_api(&server, &token, "A perfectly public post", json!({})).await;
        let id = created["data"]["post"]["id"].as_str().unwrap().to_string();

        let fetched = server.get(&format!("/{id}")).await;
        fetched.assert_status_ok();
        let body: Value = fetched.json();
        assert_eq!(body["data"]["post"]["title"], "A perfectly public post");
        assert!(body["data"]["post"]["author"]["name"].is_string());

        // Soft-deleted reads as missing
        server
            .delete(&format!("/softDelete/{id}"))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();
        let gone = server.get(&format!("/{id}")).await;
        gone.assert_status(StatusCode::NOT_FOUND);
        let body: Value = gone.json();
        assert_eq!(body["message"], "No document found with that ID");

        let missing = server.get(&format!("/{}", Uuid::new_v4())).await;
        missing.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unparseable_id_and_query_use_error_envelope(pool: SqlitePool) {
        let state = create_test_state(pool);
        let server = TestServer::new(test_router(state)).unwrap();

        // Both rejections speak the fail envelope rather than axum's
        // plain-text default
        let bad_id = server.get("/not-a-uuid").await;
        bad_id.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = bad_id.json();
        assert_eq!(body["status"], "fail");

        let bad_query = server.get("/").add_query_param("solved", "banana").await;
        bad_query.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = bad_query.json();
        assert_eq!(body["status"], "fail");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_post_reslugs_title(pool: SqlitePool) {
        let (server, token) = server_and_token(pool, Role::Admin).await;

        let created = create_post_via_api(&server, &token, "Original title here", json!({})).await;
        let id = created["data"]["post"]["id"].as_str().unwrap().to_string();

        let updated = server
            .patch(&format!("/{id}"))
            .authorization_bearer(&token)
            .json(&json!({"title": "Completely new title", "solved": true}))
            .await;
        updated.assert_status_ok();
        let body: Value = updated.json();
        assert_eq!(body["data"]["post"]["title"], "Completely new title");
        assert_eq!(body["data"]["post"]["slug"], "completely-new-title");
        assert_eq!(body["data"]["post"]["solved"], true);
        // Untouched fields survive
        assert_eq!(body["data"]["post"]["category"], "infrastructure");

        let invalid = server
            .patch(&format!("/{id}"))
            .authorization_bearer(&token)
            .json(&json!({"title": "nope"}))
            .await;
        invalid.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_archive_lifecycle(pool: SqlitePool) {
        let (server, token) = server_and_token(pool, Role::Admin).await;

        let keeper = create_post_via_api(&server, &token, "A post that stays up", json!({})).await;
        let victim = create_post_via_api(&server, &token, "A post headed for the bin", json!({})).await;
        let keeper_id = keeper["data"]["post"]["id"].as_str().unwrap().to_string();
        let victim_id = victim["data"]["post"]["id"].as_str().unwrap().to_string();

        // Archive one
        let archived = server.delete(&format!("/softDelete/{victim_id}")).authorization_bearer(&token).await;
        archived.assert_status_ok();
        let body: Value = archived.json();
        assert_eq!(body["data"]["post"]["id"], victim_id.as_str());

        let public: Value = server.get("/").await.json();
        assert_eq!(public["results"], 1);
        assert_eq!(public["data"]["posts"][0]["id"], keeper_id.as_str());

        let archive: Value = server.get("/archive").authorization_bearer(&token).await.json();
        assert_eq!(archive["results"], 1);
        assert_eq!(archive["data"]["posts"][0]["id"], victim_id.as_str());

        // Restore it
        let restored = server.patch(&format!("/archive/{victim_id}")).authorization_bearer(&token).await;
        restored.assert_status_ok();
        let public: Value = server.get("/").await.json();
        assert_eq!(public["results"], 2);

        // Archive again, then delete for good
        server
            .delete(&format!("/softDelete/{victim_id}"))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();
        let erased = server.delete(&format!("/archive/{victim_id}")).authorization_bearer(&token).await;
        erased.assert_status(StatusCode::NO_CONTENT);

        let archive: Value = server.get("/archive").authorization_bearer(&token).await.json();
        assert_eq!(archive["results"], 0);
        server
            .get(&format!("/{victim_id}"))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        // Hard-deleting a missing post is a 404
        server
            .delete(&format!("/archive/{victim_id}"))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_monthly_stats(pool: SqlitePool) {
        let (server, token) = server_and_token(pool.clone(), Role::User).await;

        let first = create_post_via_api(&server, &token, "July post number one", json!({})).await;
        let second = create_post_via_api(&server, &token, "July post number two", json!({})).await;
        let third = create_post_via_api(&server, &token, "Lonely March post", json!({})).await;

        // Pin the posts to known months of a known year
        let backdate = |id: &Value, at| {
            let id = Uuid::parse_str(id.as_str().unwrap()).unwrap();
            let pool = pool.clone();
            async move {
                sqlx::query("UPDATE posts SET created_at = ? WHERE id = ?")
                    .bind(at)
                    .bind(id)
                    .execute(&pool)
                    .await
                    .unwrap();
            }
        };
        backdate(&first["data"]["post"]["id"], Utc.with_ymd_and_hms(2021, 7, 3, 9, 0, 0).unwrap()).await;
        backdate(&second["data"]["post"]["id"], Utc.with_ymd_and_hms(2021, 7, 21, 17, 30, 0).unwrap()).await;
        backdate(&third["data"]["post"]["id"], Utc.with_ymd_and_hms(2021, 3, 14, 12, 0, 0).unwrap()).await;

        let response = server.get("/monthly-stats/2021").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "success");
        let stats = body["data"]["stats"].as_array().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0]["month"], 7);
        assert_eq!(stats[0]["count"], 2);
        assert_eq!(stats[1]["month"], 3);
        assert_eq!(stats[1]["count"], 1);
        let titles = stats[1]["titles"].as_array().unwrap();
        assert_eq!(titles[0], "Lonely March post");

        // A year with no posts is an empty list, not an error
        let empty: Value = server.get("/monthly-stats/1999").await.json();
        assert_eq!(empty["data"]["stats"].as_array().unwrap().len(), 0);

        server.get("/monthly-stats/12000").await.assert_status(StatusCode::BAD_REQUEST);
    }
}
