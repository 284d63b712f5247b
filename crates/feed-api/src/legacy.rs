//! Handlers for the legacy post generation, served under `/old`.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use feed_db::models::{NewPost, PostChanges};
use feed_db::{Generation, PostFilter};
use feed_types::api::{
    Claims, CommentRequest, HashTagView, PostDetailResponse, PostListResponse, PostRequest, ToggleLikeResponse,
    ToggleSaveResponse, UserPostsResponse,
};

use crate::auth::AppState;
use crate::engagement;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::forms::clean_post;
use crate::render::{comment_threads, legacy_post, legacy_posts};
use crate::tags::{extract_hashtags, extract_mentions, normalize_hashtag};
use crate::{ListQuery, owned_refs, run_db};

/// GET /old: the main legacy feed, optionally narrowed to one hashtag.
pub async fn feed_list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let active_hashtag = query.hashtag.as_deref().and_then(normalize_hashtag);
    let filter = PostFilter {
        hashtag: active_hashtag.clone(),
        pinned_first: true,
        limit: query.limit(),
        offset: query.offset,
        ..Default::default()
    };
    let viewer = claims.sub.to_string();

    let posts = run_db(&state, move |db| {
        let rows = db.list_posts(&filter)?;
        Ok(legacy_posts(db, rows, &viewer)?)
    })
    .await?;

    Ok(Json(PostListResponse { posts, active_hashtag }))
}

pub async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let viewer = claims.sub.to_string();

    let response = run_db(&state, move |db| {
        if !db.post_exists(Generation::Legacy, &id, true)? {
            return Err(ApiError::NotFound);
        }
        db.increment_views(Generation::Legacy, &id)?;
        let row = db.get_post(&id, true)?.ok_or(ApiError::NotFound)?;
        let post = legacy_post(db, row, &viewer)?;
        let (comments, user_liked_comments) = comment_threads(db, Generation::Legacy, &id, &viewer)?;
        Ok(PostDetailResponse {
            user_liked: post.liked,
            user_saved: post.saved,
            post,
            comments,
            user_liked_comments,
        })
    })
    .await?;

    Ok(Json(response))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostRequest>,
) -> ApiResult<impl IntoResponse> {
    let author = claims.sub.to_string();

    let post = run_db(&state, move |db| {
        let uploads: Vec<Uuid> = req.image.into_iter().chain(req.video).collect();
        let blogs: Vec<Uuid> = req.blog.into_iter().collect();
        let refs = owned_refs(db, &author, &uploads, &blogs)?;
        let clean = clean_post(&req, &refs).map_err(ApiError::Validation)?;

        let id = Uuid::new_v4().to_string();
        let image = clean.image.map(|u| u.to_string());
        let video = clean.video.map(|u| u.to_string());
        let blog = clean.blog.map(|u| u.to_string());
        db.insert_post(
            &NewPost {
                id: &id,
                author_id: &author,
                post_type: clean.post_type.as_str(),
                content: &clean.content,
                image_id: image.as_deref(),
                video_id: video.as_deref(),
                blog_id: blog.as_deref(),
            },
            &extract_hashtags(&clean.content),
            &extract_mentions(&clean.content),
        )?;

        let row = db
            .get_post(&id, false)?
            .ok_or_else(|| anyhow::anyhow!("post {} missing after insert", id))?;
        Ok(legacy_post(db, row, &author)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn edit_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(mut req): Json<PostRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let author = claims.sub.to_string();

    let post = run_db(&state, move |db| {
        let existing = db
            .get_post(&id, false)?
            .filter(|p| p.author_id == author)
            .ok_or(ApiError::NotFound)?;

        // An omitted file keeps the one already attached.
        if req.image.is_none() {
            req.image = existing.image_id.as_deref().and_then(|v| v.parse().ok());
        }
        if req.video.is_none() {
            req.video = existing.video_id.as_deref().and_then(|v| v.parse().ok());
        }

        let uploads: Vec<Uuid> = req.image.into_iter().chain(req.video).collect();
        let blogs: Vec<Uuid> = req.blog.into_iter().collect();
        let refs = owned_refs(db, &author, &uploads, &blogs)?;
        let clean = clean_post(&req, &refs).map_err(ApiError::Validation)?;

        let image = clean.image.map(|u| u.to_string());
        let video = clean.video.map(|u| u.to_string());
        let blog = clean.blog.map(|u| u.to_string());
        let changes = PostChanges {
            post_type: clean.post_type.as_str(),
            content: &clean.content,
            image_id: image.as_deref(),
            video_id: video.as_deref(),
            blog_id: blog.as_deref(),
        };
        let hashtags = extract_hashtags(&clean.content);
        let mentions = extract_mentions(&clean.content);
        if !db.update_post(&id, &author, &changes, &hashtags, &mentions)? {
            return Err(ApiError::NotFound);
        }
        debug!("Post {} edited", id);

        let row = db.get_post(&id, false)?.ok_or(ApiError::NotFound)?;
        Ok(legacy_post(db, row, &author)?)
    })
    .await?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let author = claims.sub.to_string();

    let deleted = run_db(&state, move |db| Ok(db.delete_post(&id, &author)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound);
    }
    debug!("Post {} deleted", post_id);
    Ok(Json(json!({ "deleted": post_id })))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let comment = engagement::add_comment(&state, Generation::Legacy, post_id, &claims, req).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let comment = engagement::edit_comment(&state, Generation::Legacy, comment_id, &claims, req).await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let deleted = engagement::delete_comment(&state, Generation::Legacy, comment_id, &claims).await?;
    Ok(Json(deleted))
}

pub async fn toggle_post_like(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let (liked, likes_count) = engagement::toggle_post_like(&state, Generation::Legacy, post_id, &claims).await?;
    Ok(Json(ToggleLikeResponse { liked, likes_count }))
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let (liked, likes_count) =
        engagement::toggle_comment_like(&state, Generation::Legacy, comment_id, &claims).await?;
    Ok(Json(ToggleLikeResponse { liked, likes_count }))
}

pub async fn toggle_save(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let saved = engagement::toggle_save(&state, Generation::Legacy, post_id, &claims).await?;
    Ok(Json(ToggleSaveResponse { saved }))
}

pub async fn user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<ListQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let viewer = claims.sub.to_string();
    let limit = query.limit();

    let response = run_db(&state, move |db| {
        let user = db.get_user_by_username(&username)?.ok_or(ApiError::NotFound)?;
        let filter = PostFilter {
            author_id: Some(user.id),
            limit,
            offset: query.offset,
            ..Default::default()
        };
        let rows = db.list_posts(&filter)?;
        Ok(UserPostsResponse {
            profile_username: user.username,
            posts: legacy_posts(db, rows, &viewer)?,
        })
    })
    .await?;

    Ok(Json(response))
}

pub async fn saved_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let viewer = claims.sub.to_string();
    let filter = PostFilter {
        saved_by: Some(viewer.clone()),
        limit: query.limit(),
        offset: query.offset,
        ..Default::default()
    };

    let posts = run_db(&state, move |db| {
        let rows = db.list_posts(&filter)?;
        Ok(legacy_posts(db, rows, &viewer)?)
    })
    .await?;

    Ok(Json(PostListResponse {
        posts,
        active_hashtag: None,
    }))
}

pub async fn hashtags(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = run_db(&state, |db| Ok(db.list_hashtags()?)).await?;
    let tags: Vec<HashTagView> = rows
        .into_iter()
        .map(|row| HashTagView {
            name: row.name,
            posts_count: row.posts_count.max(0) as u64,
        })
        .collect();
    Ok(Json(tags))
}
