//! Handlers for the unified feed: blog, project and normal posts.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use feed_db::models::{FeedPostRow, NewFeedPost, NewLink, NewMedia};
use feed_db::{Database, Generation};
use feed_types::api::{
    BlogPostRequest, Claims, CommentRequest, FeedListResponse, FeedPostDetailResponse, FeedPostView,
    FeedToggleLikeResponse, FeedToggleSaveResponse, NormalPostRequest, ProjectPostRequest,
};
use feed_types::models::FeedPostType;

use crate::auth::AppState;
use crate::engagement;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::forms::{CleanLink, CleanMedia, MAX_MEDIA_FILES, clean_blog_post, clean_normal_post, clean_project_post};
use crate::render::{comment_threads, feed_post, feed_posts};
use crate::{ListQuery, owned_refs, run_db};

/// GET /: active feed posts, pinned first then newest.
pub async fn feed_list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let viewer = claims.sub.to_string();
    let (limit, offset) = (query.limit(), query.offset);

    let posts = run_db(&state, move |db| {
        let rows = db.list_feed_posts(limit, offset)?;
        Ok(feed_posts(db, rows, &viewer)?)
    })
    .await?;

    Ok(Json(FeedListResponse { posts }))
}

pub async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let viewer = claims.sub.to_string();

    let response = run_db(&state, move |db| {
        if !db.post_exists(Generation::Current, &id, true)? {
            return Err(ApiError::NotFound);
        }
        db.increment_views(Generation::Current, &id)?;
        let row = db.get_feed_post(&id, true)?.ok_or(ApiError::NotFound)?;
        let post = feed_post(db, row, &viewer)?;
        let (comments, _) = comment_threads(db, Generation::Current, &id, &viewer)?;
        Ok(FeedPostDetailResponse {
            user_has_liked: post.is_liked_by_user,
            user_has_saved: post.is_saved_by_user,
            post,
            comments,
        })
    })
    .await?;

    Ok(Json(response))
}

fn check_media_count(media: &[Uuid]) -> ApiResult<()> {
    if media.len() > MAX_MEDIA_FILES {
        return Err(ApiError::BadRequest(format!(
            "Maximum {} images/videos allowed.",
            MAX_MEDIA_FILES
        )));
    }
    Ok(())
}

fn new_media(media: &[CleanMedia]) -> Vec<NewMedia> {
    media
        .iter()
        .map(|m| NewMedia {
            file_id: m.file.to_string(),
            media_type: m.media_type.as_str().to_string(),
            sort_order: m.order.into(),
        })
        .collect()
}

fn new_links(links: &[CleanLink]) -> Vec<NewLink> {
    links
        .iter()
        .map(|l| NewLink {
            title: l.title.clone(),
            url: l.url.clone(),
            sort_order: l.order.into(),
        })
        .collect()
}

/// Insert, then read back the post as the author sees it.
fn store(
    db: &Database,
    post: &NewFeedPost<'_>,
    media: &[NewMedia],
    links: &[NewLink],
) -> ApiResult<FeedPostView> {
    db.insert_feed_post(post, media, links)?;
    let row: FeedPostRow = db
        .get_feed_post(post.id, false)?
        .ok_or_else(|| anyhow::anyhow!("feed post {} missing after insert", post.id))?;
    Ok(feed_post(db, row, post.author_id)?)
}

pub async fn create_blog_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BlogPostRequest>,
) -> ApiResult<impl IntoResponse> {
    let author = claims.sub.to_string();

    let post = run_db(&state, move |db| {
        let uploads: Vec<Uuid> = req.blog_thumbnail.into_iter().collect();
        let refs = owned_refs(db, &author, &uploads, &[])?;
        let clean = clean_blog_post(&req, &refs).map_err(ApiError::Validation)?;

        let id = Uuid::new_v4().to_string();
        let thumbnail = clean.thumbnail.map(|u| u.to_string());
        store(
            db,
            &NewFeedPost {
                id: &id,
                author_id: &author,
                post_type: FeedPostType::Blog.as_str(),
                blog_title: Some(&clean.title),
                blog_thumbnail_id: thumbnail.as_deref(),
                blog_content: Some(&clean.content),
                ..Default::default()
            },
            &[],
            &[],
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn create_project_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ProjectPostRequest>,
) -> ApiResult<impl IntoResponse> {
    check_media_count(&req.media)?;
    let author = claims.sub.to_string();

    let post = run_db(&state, move |db| {
        let refs = owned_refs(db, &author, &req.media, &[])?;
        let clean = clean_project_post(&req, &refs).map_err(ApiError::Validation)?;

        let id = Uuid::new_v4().to_string();
        store(
            db,
            &NewFeedPost {
                id: &id,
                author_id: &author,
                post_type: FeedPostType::Project.as_str(),
                project_title: Some(&clean.title),
                project_content: Some(&clean.content),
                ..Default::default()
            },
            &new_media(&clean.media),
            &new_links(&clean.links),
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn create_normal_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NormalPostRequest>,
) -> ApiResult<impl IntoResponse> {
    check_media_count(&req.media)?;
    let author = claims.sub.to_string();

    let post = run_db(&state, move |db| {
        let refs = owned_refs(db, &author, &req.media, &[])?;
        let clean = clean_normal_post(&req, &refs).map_err(ApiError::Validation)?;

        let id = Uuid::new_v4().to_string();
        store(
            db,
            &NewFeedPost {
                id: &id,
                author_id: &author,
                post_type: FeedPostType::Normal.as_str(),
                normal_content: Some(&clean.content),
                ..Default::default()
            },
            &new_media(&clean.media),
            &[],
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let author = claims.sub.to_string();

    let deleted = run_db(&state, move |db| Ok(db.delete_feed_post(&id, &author)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    debug!("Feed post {} deleted", post_id);
    Ok(Json(json!({ "success": true, "deleted": post_id })))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let (liked, likes_count) = engagement::toggle_post_like(&state, Generation::Current, post_id, &claims).await?;
    Ok(Json(FeedToggleLikeResponse {
        success: true,
        liked,
        likes_count,
    }))
}

pub async fn toggle_save(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let saved = engagement::toggle_save(&state, Generation::Current, post_id, &claims).await?;
    Ok(Json(FeedToggleSaveResponse { success: true, saved }))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let comment = engagement::add_comment(&state, Generation::Current, post_id, &claims, req).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let (liked, likes_count) =
        engagement::toggle_comment_like(&state, Generation::Current, comment_id, &claims).await?;
    Ok(Json(FeedToggleLikeResponse {
        success: true,
        liked,
        likes_count,
    }))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let comment = engagement::edit_comment(&state, Generation::Current, comment_id, &claims, req).await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let deleted = engagement::delete_comment(&state, Generation::Current, comment_id, &claims).await?;
    Ok(Json(deleted))
}
