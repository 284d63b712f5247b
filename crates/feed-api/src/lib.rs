pub mod auth;
pub mod engagement;
pub mod error;
pub mod extract;
pub mod forms;
pub mod legacy;
pub mod media;
pub mod middleware;
pub mod posts;
pub mod render;
pub mod tags;
pub mod threads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use feed_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::forms::OwnedRefs;
use crate::render::parse_uuid;

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 200;

/// `?hashtag=&limit=&offset=` on the list endpoints. The hashtag filter only
/// applies to the legacy feed.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub hashtag: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl ListQuery {
    pub fn limit(&self) -> u32 {
        self.limit.min(MAX_PAGE_SIZE)
    }
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
}

/// Resolve the upload and blog ids a form references to the ones `user_id`
/// actually owns.
pub(crate) fn owned_refs(
    db: &Database,
    user_id: &str,
    uploads: &[Uuid],
    blogs: &[Uuid],
) -> anyhow::Result<OwnedRefs> {
    let mut refs = OwnedRefs::new();

    let upload_ids: Vec<String> = uploads.iter().map(Uuid::to_string).collect();
    for row in db.owned_uploads(user_id, &upload_ids)? {
        refs.add_upload(parse_uuid(&row.id, "upload id"), row.content_type);
    }

    let blog_ids: Vec<String> = blogs.iter().map(Uuid::to_string).collect();
    for id in db.owned_blog_ids(user_id, &blog_ids)? {
        refs.add_blog(parse_uuid(&id, "blog id"));
    }
    Ok(refs)
}

/// Every route of the service. Only register and login are reachable
/// without a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        // Supporting resources
        .route("/blogs", get(media::list_blogs).post(media::create_blog))
        .route(
            "/media",
            post(media::upload_media).layer(DefaultBodyLimit::max(media::MAX_UPLOAD_BYTES)),
        )
        .route("/media/{id}", get(media::download_media))
        // Legacy feed
        .route("/old", get(legacy::feed_list))
        .route("/old/post/create", post(legacy::create_post))
        .route("/old/post/{id}", get(legacy::post_detail))
        .route("/old/post/{id}/edit", post(legacy::edit_post))
        .route("/old/post/{id}/delete", post(legacy::delete_post))
        .route("/old/post/{id}/comment", post(legacy::add_comment))
        .route("/old/post/{id}/like", post(legacy::toggle_post_like))
        .route("/old/post/{id}/save", post(legacy::toggle_save))
        .route("/old/comment/{id}/edit", post(legacy::edit_comment))
        .route("/old/comment/{id}/delete", post(legacy::delete_comment))
        .route("/old/comment/{id}/like", post(legacy::toggle_comment_like))
        .route("/old/user/{username}/posts", get(legacy::user_posts))
        .route("/old/saved", get(legacy::saved_posts))
        .route("/old/hashtags", get(legacy::hashtags))
        // Unified feed
        .route("/", get(posts::feed_list))
        .route("/post/{id}", get(posts::post_detail))
        .route("/create/blog", post(posts::create_blog_post))
        .route("/create/project", post(posts::create_project_post))
        .route("/create/normal", post(posts::create_normal_post))
        .route("/post/{id}/like", post(posts::toggle_like))
        .route("/post/{id}/save", post(posts::toggle_save))
        .route("/post/{id}/comment", post(posts::add_comment))
        .route("/post/{id}/delete", post(posts::delete_post))
        .route("/comment/{id}/like", post(posts::toggle_comment_like))
        .route("/comment/{id}/edit", post(posts::edit_comment))
        .route("/comment/{id}/delete", post(posts::delete_comment))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{AppStateInner, create_token};

    const SECRET: &str = "test-secret";

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.into(),
            upload_dir: std::env::temp_dir().join(format!("feed-test-{}", Uuid::new_v4())),
        })
    }

    /// Create a user directly and return a bearer token for them.
    fn login_as(state: &AppState, username: &str) -> String {
        let id = Uuid::new_v4();
        state.db.create_user(&id.to_string(), username, "unused-hash").unwrap();
        create_token(SECRET, id, username).unwrap()
    }

    async fn call(state: &AppState, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn upload(state: &AppState, token: &str, content_type: &str, bytes: &'static [u8]) -> (StatusCode, Value) {
        upload_body(state, token, content_type, Body::from(bytes)).await
    }

    async fn upload_body(state: &AppState, token: &str, content_type: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/media")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let state = test_state();
        let (status, body) = call(&state, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = call(&state, "GET", "/old", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_and_login() {
        let state = test_state();
        let creds = json!({ "username": "alice", "password": "correct horse" });

        let (status, body) = call(&state, "POST", "/auth/register", None, Some(creds.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["token"].is_string());

        let (status, _) = call(&state, "POST", "/auth/register", None, Some(creds.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&state, "POST", "/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");

        let wrong = json!({ "username": "alice", "password": "wrong password" });
        let (status, _) = call(&state, "POST", "/auth/login", None, Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let short = json!({ "username": "al", "password": "longenough" });
        let (status, _) = call(&state, "POST", "/auth/register", None, Some(short)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn legacy_post_tags_likes_and_views() {
        let state = test_state();
        let alice = login_as(&state, "alice");
        let bob = login_as(&state, "bob");

        let (status, post) = call(
            &state,
            "POST",
            "/old/post/create",
            Some(&alice),
            Some(json!({ "content": "  Hello #Rust and #rust, hi @bob @ghost  " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["post_type"], "text");
        assert_eq!(post["hashtags"], json!(["rust"]));
        assert_eq!(post["mentions"], json!(["bob"]));
        let id = post["id"].as_str().unwrap().to_string();

        let (status, feed) = call(&state, "GET", "/old?hashtag=%23RUST", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(feed["active_hashtag"], "rust");
        assert_eq!(feed["posts"].as_array().unwrap().len(), 1);

        let like = format!("/old/post/{}/like", id);
        let (_, body) = call(&state, "POST", &like, Some(&bob), None).await;
        assert_eq!(body, json!({ "liked": true, "likes_count": 1 }));
        let (_, body) = call(&state, "POST", &like, Some(&bob), None).await;
        assert_eq!(body, json!({ "liked": false, "likes_count": 0 }));

        let save = format!("/old/post/{}/save", id);
        let (_, body) = call(&state, "POST", &save, Some(&bob), None).await;
        assert_eq!(body, json!({ "saved": true }));
        let (_, saved) = call(&state, "GET", "/old/saved", Some(&bob), None).await;
        assert_eq!(saved["posts"][0]["id"], id.as_str());

        let detail = format!("/old/post/{}", id);
        call(&state, "GET", &detail, Some(&bob), None).await;
        let (status, body) = call(&state, "GET", &detail, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["post"]["views_count"], 2);
        assert_eq!(body["user_saved"], true);

        let (_, tags) = call(&state, "GET", "/old/hashtags", Some(&bob), None).await;
        assert_eq!(tags, json!([{ "name": "rust", "posts_count": 1 }]));
    }

    #[tokio::test]
    async fn legacy_form_errors_are_field_maps() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let (status, body) = call(
            &state,
            "POST",
            "/old/post/create",
            Some(&alice),
            Some(json!({ "post_type": "image", "content": "no picture" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION");
        assert_eq!(body["error"]["fields"]["__all__"][0], "Image posts must have an image.");
    }

    #[tokio::test]
    async fn edit_and_delete_are_author_only() {
        let state = test_state();
        let alice = login_as(&state, "alice");
        let bob = login_as(&state, "bob");

        let (_, post) = call(&state, "POST", "/old/post/create", Some(&alice), Some(json!({ "content": "v1" }))).await;
        let id = post["id"].as_str().unwrap().to_string();

        let edit = format!("/old/post/{}/edit", id);
        let (status, _) = call(&state, "POST", &edit, Some(&bob), Some(json!({ "content": "mine now" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = call(&state, "POST", &edit, Some(&alice), Some(json!({ "content": "v2 #edited" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hashtags"], json!(["edited"]));

        let delete = format!("/old/post/{}/delete", id);
        let (status, _) = call(&state, "POST", &delete, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, "POST", &delete, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&state, "GET", &format!("/old/post/{}", id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn replies_attach_to_the_thread_root() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let (status, post) = call(&state, "POST", "/create/normal", Some(&alice), Some(json!({ "normal_content": "hi" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let post_id = post["id"].as_str().unwrap().to_string();
        let comment = format!("/post/{}/comment", post_id);

        let (_, c1) = call(&state, "POST", &comment, Some(&alice), Some(json!({ "content": "top" }))).await;
        let c1 = c1["id"].as_str().unwrap().to_string();
        let (_, c2) = call(&state, "POST", &comment, Some(&alice), Some(json!({ "content": "reply", "parent_id": c1 }))).await;
        let c2 = c2["id"].as_str().unwrap().to_string();
        let (status, c3) = call(&state, "POST", &comment, Some(&alice), Some(json!({ "content": "deeper", "parent_id": c2 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(c3["parent_id"], c1.as_str());

        let (_, empty) = call(&state, "POST", &comment, Some(&alice), Some(json!({ "content": " ", "parent_id": c1 }))).await;
        assert_eq!(empty["error"]["fields"]["content"][0], "Reply cannot be empty.");

        let (_, detail) = call(&state, "GET", &format!("/post/{}", post_id), Some(&alice), None).await;
        let comments = detail["comments"].as_array().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["replies"].as_array().unwrap().len(), 2);
        assert_eq!(detail["post"]["comments_count"], 3);
    }

    #[tokio::test]
    async fn reply_parent_must_be_on_the_same_post() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let (_, a) = call(&state, "POST", "/create/normal", Some(&alice), Some(json!({ "normal_content": "a" }))).await;
        let (_, b) = call(&state, "POST", "/create/normal", Some(&alice), Some(json!({ "normal_content": "b" }))).await;
        let (_, on_a) = call(
            &state,
            "POST",
            &format!("/post/{}/comment", a["id"].as_str().unwrap()),
            Some(&alice),
            Some(json!({ "content": "on a" })),
        )
        .await;

        let (status, _) = call(
            &state,
            "POST",
            &format!("/post/{}/comment", b["id"].as_str().unwrap()),
            Some(&alice),
            Some(json!({ "content": "cross", "parent_id": on_a["id"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn feed_toggles_report_success() {
        let state = test_state();
        let alice = login_as(&state, "alice");
        let (_, post) = call(&state, "POST", "/create/normal", Some(&alice), Some(json!({ "normal_content": "x" }))).await;
        let id = post["id"].as_str().unwrap();

        let (_, body) = call(&state, "POST", &format!("/post/{}/like", id), Some(&alice), None).await;
        assert_eq!(body, json!({ "success": true, "liked": true, "likes_count": 1 }));
        let (_, body) = call(&state, "POST", &format!("/post/{}/save", id), Some(&alice), None).await;
        assert_eq!(body, json!({ "success": true, "saved": true }));

        let (_, feed) = call(&state, "GET", "/", Some(&alice), None).await;
        assert_eq!(feed["posts"][0]["is_liked_by_user"], true);
        assert_eq!(feed["posts"][0]["is_saved_by_user"], true);

        let (status, _) = call(&state, "POST", &format!("/post/{}/like", Uuid::new_v4()), Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn media_limit_is_checked_first() {
        let state = test_state();
        let alice = login_as(&state, "alice");
        let media: Vec<String> = (0..6).map(|_| Uuid::new_v4().to_string()).collect();

        let (status, body) = call(&state, "POST", "/create/normal", Some(&alice), Some(json!({ "media": media }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Maximum 5 images/videos allowed.");
    }

    #[tokio::test]
    async fn uploads_attach_to_project_posts() {
        let state = test_state();
        let alice = login_as(&state, "alice");
        let bob = login_as(&state, "bob");

        let (status, image) = upload(&state, &alice, "image/png", b"\x89PNG fake").await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, pdf) = upload(&state, &alice, "application/pdf", b"%PDF fake").await;
        let (status, _) = upload(&state, &alice, "image/png", b"").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = json!({
            "project_title": "Feed",
            "project_content": "<p>desc</p>",
            "link_title_2": "Code",
            "link_url_2": "https://code.example/feed",
            "media": [pdf["media_id"], image["media_id"]],
        });
        let (status, post) = call(&state, "POST", "/create/project", Some(&alice), Some(request.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["title"], "Feed");
        assert_eq!(post["media"], json!([{
            "id": post["media"][0]["id"],
            "media_type": "image",
            "file": image["media_id"],
            "order": 1,
            "uploaded_at": post["media"][0]["uploaded_at"],
        }]));
        assert_eq!(post["project_links"], json!([{ "title": "Code", "url": "https://code.example/feed", "order": 2 }]));

        // someone else's upload is not attachable
        let (status, body) = call(&state, "POST", "/create/project", Some(&bob), Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["fields"]["media"].is_array());

        let media_id = image["media_id"].as_str().unwrap();
        let request = Request::builder()
            .uri(format!("/media/{}", media_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", bob))
            .body(Body::empty())
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"\x89PNG fake");

        let _ = std::fs::remove_dir_all(&state.upload_dir);
    }

    #[tokio::test]
    async fn blog_posts_and_blogs() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let (status, blog) = call(&state, "POST", "/blogs", Some(&alice), Some(json!({ "title": "Notes" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, blogs) = call(&state, "GET", "/blogs", Some(&alice), None).await;
        assert_eq!(blogs[0]["title"], "Notes");

        let (status, post) = call(
            &state,
            "POST",
            "/old/post/create",
            Some(&alice),
            Some(json!({ "post_type": "blog", "content": "new entry", "blog": blog["id"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["blog"]["title"], "Notes");

        let (status, body) = call(&state, "POST", "/create/blog", Some(&alice), Some(json!({ "blog_title": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["fields"]["blog_title"][0], "Blog title is required.");

        let (status, post) = call(
            &state,
            "POST",
            "/create/blog",
            Some(&alice),
            Some(json!({ "blog_title": "Hello", "blog_content": "<p>body</p>" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["post_type"], "blog");
        assert_eq!(post["content"], "<p>body</p>");
    }

    #[tokio::test]
    async fn user_posts_page() {
        let state = test_state();
        let alice = login_as(&state, "alice");
        call(&state, "POST", "/old/post/create", Some(&alice), Some(json!({ "content": "one" }))).await;

        let (status, body) = call(&state, "GET", "/old/user/alice/posts", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profile_username"], "alice");
        assert_eq!(body["posts"].as_array().unwrap().len(), 1);

        let (status, _) = call(&state, "GET", "/old/user/nobody/posts", Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn legacy_edit_keeps_attached_image() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let (_, image) = upload(&state, &alice, "image/png", b"\x89PNG fake").await;
        let (status, post) = call(
            &state,
            "POST",
            "/old/post/create",
            Some(&alice),
            Some(json!({ "post_type": "image", "content": "caption", "image": image["media_id"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = post["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &state,
            "POST",
            &format!("/old/post/{}/edit", id),
            Some(&alice),
            Some(json!({ "post_type": "image", "content": "new caption" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "new caption");
        assert_eq!(body["image"], image["media_id"]);

        let _ = std::fs::remove_dir_all(&state.upload_dir);
    }

    #[tokio::test]
    async fn malformed_requests_get_json_errors() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let (status, body) = call(&state, "GET", "/old/post/not-a-uuid", Some(&alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (status, body) = call(&state, "POST", "/create/normal", Some(&alice), Some(json!({ "normal_content": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let (status, body) = call(&state, "GET", "/?limit=-1", Some(&alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let body = Body::from(vec![0u8; media::MAX_UPLOAD_BYTES + 1]);
        let (status, body) = upload_body(&state, &alice, "image/png", body).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn failed_upload_leaves_no_file() {
        let state = test_state();
        // valid token for a user with no row, so the upload insert fails
        let ghost = create_token(SECRET, Uuid::new_v4(), "ghost").unwrap();

        let (status, body) = upload(&state, &ghost, "image/png", b"\x89PNG fake").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");

        let leftover = std::fs::read_dir(&state.upload_dir).map(|dir| dir.count()).unwrap_or(0);
        assert_eq!(leftover, 0);

        let _ = std::fs::remove_dir_all(&state.upload_dir);
    }

    #[tokio::test]
    async fn comment_routes_in_both_generations() {
        let state = test_state();
        let alice = login_as(&state, "alice");
        let bob = login_as(&state, "bob");

        let generations = [
            ("/old/post/create", json!({ "content": "legacy" }), "/old/post", "/old/comment", false),
            ("/create/normal", json!({ "normal_content": "feed" }), "/post", "/comment", true),
        ];
        for (create, request, posts, comments, reports_success) in generations {
            let (_, post) = call(&state, "POST", create, Some(&alice), Some(request)).await;
            let post_id = post["id"].as_str().unwrap().to_string();
            let (status, comment) = call(
                &state,
                "POST",
                &format!("{}/{}/comment", posts, post_id),
                Some(&alice),
                Some(json!({ "content": "first" })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            let comment_id = comment["id"].as_str().unwrap().to_string();

            let like = format!("{}/{}/like", comments, comment_id);
            let (status, body) = call(&state, "POST", &like, Some(&bob), None).await;
            assert_eq!(status, StatusCode::OK);
            let expected = if reports_success {
                json!({ "success": true, "liked": true, "likes_count": 1 })
            } else {
                json!({ "liked": true, "likes_count": 1 })
            };
            assert_eq!(body, expected);

            let edit = format!("{}/{}/edit", comments, comment_id);
            let (status, _) = call(&state, "POST", &edit, Some(&bob), Some(json!({ "content": "hijacked" }))).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            let (status, body) = call(&state, "POST", &edit, Some(&alice), Some(json!({ "content": "fixed" }))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["content"], "fixed");
            assert_eq!(body["is_edited"], true);

            let delete = format!("{}/{}/delete", comments, comment_id);
            let (status, _) = call(&state, "POST", &delete, Some(&bob), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            let (status, body) = call(&state, "POST", &delete, Some(&alice), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "deleted": comment_id, "post_id": post_id }));

            let (status, _) = call(&state, "POST", &like, Some(&bob), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn only_legacy_engagement_needs_an_active_post() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let (_, legacy) = call(&state, "POST", "/old/post/create", Some(&alice), Some(json!({ "content": "old" }))).await;
        let (_, feed) = call(&state, "POST", "/create/normal", Some(&alice), Some(json!({ "normal_content": "new" }))).await;
        let legacy_id = legacy["id"].as_str().unwrap().to_string();
        let feed_id = feed["id"].as_str().unwrap().to_string();

        state
            .db
            .with_conn(|conn| {
                conn.execute("UPDATE posts SET is_active = 0 WHERE id = ?1", [&legacy_id])?;
                conn.execute("UPDATE feed_posts SET is_active = 0 WHERE id = ?1", [&feed_id])?;
                Ok(())
            })
            .unwrap();

        let (status, _) = call(&state, "POST", &format!("/old/post/{}/like", legacy_id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, "POST", &format!("/old/post/{}/save", legacy_id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&state, "POST", &format!("/post/{}/like", feed_id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["liked"], true);
        let (status, _) = call(&state, "POST", &format!("/post/{}/comment", feed_id), Some(&alice), Some(json!({ "content": "still open" }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_not_found_even_when_empty() {
        let state = test_state();
        let alice = login_as(&state, "alice");

        let uri = format!("/post/{}/comment", Uuid::new_v4());
        let (status, body) = call(&state, "POST", &uri, Some(&alice), Some(json!({ "content": " " }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
