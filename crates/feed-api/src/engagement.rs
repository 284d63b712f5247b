//! Comment and toggle actions shared by both post generations. Handlers in
//! `legacy` and `posts` pick the [`Generation`] and shape the response.

use tracing::debug;
use uuid::Uuid;

use feed_db::Generation;
use feed_types::api::{Claims, CommentRequest, CommentView, DeletedCommentResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::forms::clean_comment;
use crate::render::{comment_view, parse_uuid};
use crate::run_db;

/// Legacy posts must be active to take new engagement; feed posts only need
/// to exist.
fn requires_active(generation: Generation) -> bool {
    generation == Generation::Legacy
}

pub(crate) async fn add_comment(
    state: &AppState,
    generation: Generation,
    post_id: Uuid,
    claims: &Claims,
    req: CommentRequest,
) -> ApiResult<CommentView> {
    let post_id = post_id.to_string();
    let author = claims.sub.to_string();
    let parent = req.parent_id.map(|p| p.to_string());

    run_db(state, move |db| {
        if !db.post_exists(generation, &post_id, requires_active(generation))? {
            return Err(ApiError::NotFound);
        }
        let content = clean_comment(&req, req.parent_id.is_some()).map_err(ApiError::Validation)?;

        // Replies always hang off the thread's top-level comment
        let parent_id = match parent {
            None => None,
            Some(parent) => {
                let row = db.get_comment(generation, &parent)?.ok_or(ApiError::NotFound)?;
                if row.post_id != post_id {
                    return Err(ApiError::BadRequest("Parent comment belongs to a different post.".into()));
                }
                let root = db.thread_root(generation, &parent)?.ok_or_else(|| {
                    ApiError::BadRequest("Parent comment is not part of a thread.".into())
                })?;
                Some(root)
            }
        };

        let id = Uuid::new_v4().to_string();
        db.insert_comment(generation, &id, &post_id, &author, &content, parent_id.as_deref())?;
        debug!("Comment {} added to post {}", id, post_id);

        let row = db
            .get_comment(generation, &id)?
            .ok_or_else(|| anyhow::anyhow!("comment {} missing after insert", id))?;
        Ok(comment_view(row, false))
    })
    .await
}

pub(crate) async fn edit_comment(
    state: &AppState,
    generation: Generation,
    comment_id: Uuid,
    claims: &Claims,
    req: CommentRequest,
) -> ApiResult<CommentView> {
    let id = comment_id.to_string();
    let user = claims.sub.to_string();

    run_db(state, move |db| {
        let row = db
            .get_comment(generation, &id)?
            .filter(|c| c.author_id == user)
            .ok_or(ApiError::NotFound)?;
        let content = clean_comment(&req, row.parent_id.is_some()).map_err(ApiError::Validation)?;

        if !db.update_comment(generation, &id, &user, &content)? {
            return Err(ApiError::NotFound);
        }
        let row = db
            .get_comment(generation, &id)?
            .ok_or(ApiError::NotFound)?;
        let liked = !db.liked_comment_ids(generation, &user, &[id.clone()])?.is_empty();
        Ok(comment_view(row, liked))
    })
    .await
}

pub(crate) async fn delete_comment(
    state: &AppState,
    generation: Generation,
    comment_id: Uuid,
    claims: &Claims,
) -> ApiResult<DeletedCommentResponse> {
    let id = comment_id.to_string();
    let user = claims.sub.to_string();

    let post_id = run_db(state, move |db| {
        let row = db
            .get_comment(generation, &id)?
            .filter(|c| c.author_id == user)
            .ok_or(ApiError::NotFound)?;
        if !db.delete_comment(generation, &id, &user)? {
            return Err(ApiError::NotFound);
        }
        debug!("Comment {} deleted", id);
        Ok(row.post_id)
    })
    .await?;

    Ok(DeletedCommentResponse {
        deleted: comment_id,
        post_id: parse_uuid(&post_id, "post id"),
    })
}

/// Returns (liked, likes_count) after the toggle.
pub(crate) async fn toggle_comment_like(
    state: &AppState,
    generation: Generation,
    comment_id: Uuid,
    claims: &Claims,
) -> ApiResult<(bool, u64)> {
    let id = comment_id.to_string();
    let user = claims.sub.to_string();

    let (liked, count) = run_db(state, move |db| {
        if db.get_comment(generation, &id)?.is_none() {
            return Err(ApiError::NotFound);
        }
        Ok(db.toggle_comment_like(generation, &id, &user)?)
    })
    .await?;
    Ok((liked, count.max(0) as u64))
}

/// Returns (liked, likes_count) after the toggle.
pub(crate) async fn toggle_post_like(
    state: &AppState,
    generation: Generation,
    post_id: Uuid,
    claims: &Claims,
) -> ApiResult<(bool, u64)> {
    let id = post_id.to_string();
    let user = claims.sub.to_string();

    let (liked, count) = run_db(state, move |db| {
        if !db.post_exists(generation, &id, requires_active(generation))? {
            return Err(ApiError::NotFound);
        }
        Ok(db.toggle_post_like(generation, &id, &user)?)
    })
    .await?;
    Ok((liked, count.max(0) as u64))
}

/// Returns whether the post is saved after the toggle.
pub(crate) async fn toggle_save(
    state: &AppState,
    generation: Generation,
    post_id: Uuid,
    claims: &Claims,
) -> ApiResult<bool> {
    let id = post_id.to_string();
    let user = claims.sub.to_string();

    run_db(state, move |db| {
        if !db.post_exists(generation, &id, requires_active(generation))? {
            return Err(ApiError::NotFound);
        }
        Ok(db.toggle_save(generation, &id, &user)?)
    })
    .await
}
