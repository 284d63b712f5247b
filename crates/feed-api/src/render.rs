//! Row to view conversion, plus the per-user flags and related rows each view
//! needs. Everything here runs on the blocking pool.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use feed_db::models::{CommentRow, FeedPostRow, PostMediaRow, PostRow, ProjectLinkRow};
use feed_db::{Database, Generation};
use feed_types::api::{BlogRef, CommentView, FeedPostView, MediaView, PostView, ProjectLinkView};
use feed_types::models::{FeedPostType, MediaType, PostType};

use crate::threads::build_threads;

const EXCERPT_CHARS: usize = 100;

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_time(raw: &str, what: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        DateTime::default()
    })
}

fn count(n: i64) -> u64 {
    n.max(0) as u64
}

/// First 100 characters, with `...` appended when the content was longer.
pub fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

// -- Legacy posts --

fn post_view(
    row: PostRow,
    hashtags: &mut HashMap<String, Vec<String>>,
    mentions: &mut HashMap<String, Vec<String>>,
    liked: &HashSet<String>,
    saved: &HashSet<String>,
) -> PostView {
    let post_type = row.post_type.parse().unwrap_or_else(|e| {
        warn!("Post {}: {}", row.id, e);
        PostType::default()
    });
    let blog = match (&row.blog_id, row.blog_title) {
        (Some(id), Some(title)) => Some(BlogRef {
            id: parse_uuid(id, "blog id"),
            title,
        }),
        _ => None,
    };

    PostView {
        id: parse_uuid(&row.id, "post id"),
        author_id: parse_uuid(&row.author_id, "author id"),
        author_username: row.author_username,
        post_type,
        excerpt: excerpt(&row.content),
        content: row.content,
        image: row.image_id.as_deref().map(|id| parse_uuid(id, "image id")),
        video: row.video_id.as_deref().map(|id| parse_uuid(id, "video id")),
        blog,
        created_at: parse_time(&row.created_at, "created_at"),
        updated_at: parse_time(&row.updated_at, "updated_at"),
        is_pinned: row.is_pinned,
        views_count: count(row.views_count),
        likes_count: count(row.likes_count),
        comments_count: count(row.comments_count),
        hashtags: hashtags.remove(&row.id).unwrap_or_default(),
        mentions: mentions.remove(&row.id).unwrap_or_default(),
        liked: liked.contains(&row.id),
        saved: saved.contains(&row.id),
    }
}

/// Legacy post rows with their tags and the viewer's liked/saved flags.
pub fn legacy_posts(db: &Database, rows: Vec<PostRow>, viewer: &str) -> anyhow::Result<Vec<PostView>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut hashtags = db.hashtags_for_posts(&ids)?;
    let mut mentions = db.mentions_for_posts(&ids)?;
    let liked = db.liked_post_ids(Generation::Legacy, viewer, &ids)?;
    let saved = db.saved_post_ids(Generation::Legacy, viewer, &ids)?;

    Ok(rows
        .into_iter()
        .map(|row| post_view(row, &mut hashtags, &mut mentions, &liked, &saved))
        .collect())
}

pub fn legacy_post(db: &Database, row: PostRow, viewer: &str) -> anyhow::Result<PostView> {
    let id = row.id.clone();
    legacy_posts(db, vec![row], viewer)?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("post {} vanished while rendering", id))
}

// -- Comments --

pub(crate) fn comment_view(row: CommentRow, liked: bool) -> CommentView {
    CommentView {
        id: parse_uuid(&row.id, "comment id"),
        post_id: parse_uuid(&row.post_id, "post id"),
        author_id: parse_uuid(&row.author_id, "author id"),
        author_username: row.author_username,
        content: row.content,
        parent_id: row.parent_id.as_deref().map(|id| parse_uuid(id, "parent id")),
        created_at: parse_time(&row.created_at, "created_at"),
        updated_at: parse_time(&row.updated_at, "updated_at"),
        is_edited: row.is_edited,
        likes_count: count(row.likes_count),
        liked,
        replies: Vec::new(),
    }
}

/// Threaded comments of a post and the ids of those the viewer liked.
pub fn comment_threads(
    db: &Database,
    generation: Generation,
    post_id: &str,
    viewer: &str,
) -> anyhow::Result<(Vec<CommentView>, Vec<Uuid>)> {
    let rows = db.get_comments_for_post(generation, post_id)?;
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let liked = db.liked_comment_ids(generation, viewer, &ids)?;

    let liked_ids = ids
        .iter()
        .filter(|id| liked.contains(*id))
        .map(|id| parse_uuid(id, "comment id"))
        .collect();
    let views = rows
        .into_iter()
        .map(|row| {
            let is_liked = liked.contains(&row.id);
            comment_view(row, is_liked)
        })
        .collect();
    Ok((build_threads(views), liked_ids))
}

// -- Feed posts --

fn media_view(row: PostMediaRow) -> MediaView {
    let media_type = row.media_type.parse().unwrap_or_else(|e| {
        warn!("Media {}: {}", row.id, e);
        MediaType::Image
    });
    MediaView {
        id: parse_uuid(&row.id, "media id"),
        media_type,
        file: parse_uuid(&row.file_id, "file id"),
        order: row.sort_order.max(0) as u32,
        uploaded_at: parse_time(&row.uploaded_at, "uploaded_at"),
    }
}

fn link_view(row: ProjectLinkRow) -> ProjectLinkView {
    ProjectLinkView {
        title: row.title,
        url: row.url,
        order: row.sort_order.max(0) as u32,
    }
}

fn feed_post_view(
    row: FeedPostRow,
    media: Vec<PostMediaRow>,
    links: Vec<ProjectLinkRow>,
    liked: bool,
    saved: bool,
) -> FeedPostView {
    let post_type = row.post_type.parse().unwrap_or_else(|e| {
        warn!("Feed post {}: {}", row.id, e);
        FeedPostType::Normal
    });
    let (title, content) = match post_type {
        FeedPostType::Blog => (row.blog_title, row.blog_content),
        FeedPostType::Project => (row.project_title, row.project_content),
        FeedPostType::Normal => (None, row.normal_content),
    };

    FeedPostView {
        id: parse_uuid(&row.id, "post id"),
        author_id: parse_uuid(&row.author_id, "author id"),
        author_username: row.author_username,
        post_type,
        title,
        content,
        blog_thumbnail: row
            .blog_thumbnail_id
            .as_deref()
            .map(|id| parse_uuid(id, "thumbnail id")),
        created_at: parse_time(&row.created_at, "created_at"),
        updated_at: parse_time(&row.updated_at, "updated_at"),
        is_pinned: row.is_pinned,
        views_count: count(row.views_count),
        media: media.into_iter().map(media_view).collect(),
        project_links: links.into_iter().map(link_view).collect(),
        likes_count: count(row.likes_count),
        comments_count: count(row.comments_count),
        is_liked_by_user: liked,
        is_saved_by_user: saved,
    }
}

/// Feed post rows with media, links and the viewer's flags.
pub fn feed_posts(db: &Database, rows: Vec<FeedPostRow>, viewer: &str) -> anyhow::Result<Vec<FeedPostView>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut media = db.media_for_posts(&ids)?;
    let mut links = db.links_for_posts(&ids)?;
    let liked = db.liked_post_ids(Generation::Current, viewer, &ids)?;
    let saved = db.saved_post_ids(Generation::Current, viewer, &ids)?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id.clone();
            feed_post_view(
                row,
                media.remove(&id).unwrap_or_default(),
                links.remove(&id).unwrap_or_default(),
                liked.contains(&id),
                saved.contains(&id),
            )
        })
        .collect())
}

pub fn feed_post(db: &Database, row: FeedPostRow, viewer: &str) -> anyhow::Result<FeedPostView> {
    let id = row.id.clone();
    feed_posts(db, vec![row], viewer)?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("feed post {} vanished while rendering", id))
}
