use std::collections::HashMap;

use anyhow::Result;
use rusqlite::params_from_iter;
use tracing::debug;
use uuid::Uuid;

use super::{OptionalExt, placeholders};
use crate::models::{FeedPostRow, NewFeedPost, NewLink, NewMedia, PostMediaRow, ProjectLinkRow};
use crate::{Database, now};

const FEED_POST_SELECT: &str = "
    SELECT p.id, p.author_id, u.username, p.post_type,
           p.created_at, p.updated_at, p.is_pinned, p.is_active, p.views_count,
           p.blog_title, p.blog_thumbnail_id, p.blog_content,
           p.project_title, p.project_content, p.normal_content,
           (SELECT COUNT(*) FROM post_likes_new l WHERE l.post_id = p.id),
           (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id)
    FROM feed_posts p
    LEFT JOIN users u ON u.id = p.author_id";

impl Database {
    /// Insert a feed post with its media and project links in one transaction.
    pub fn insert_feed_post(&self, post: &NewFeedPost<'_>, media: &[NewMedia], links: &[NewLink]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let stamp = now();
            tx.execute(
                "INSERT INTO feed_posts (id, author_id, post_type, created_at, updated_at,
                                         blog_title, blog_thumbnail_id, blog_content,
                                         project_title, project_content, normal_content)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    post.id,
                    post.author_id,
                    post.post_type,
                    stamp,
                    post.blog_title,
                    post.blog_thumbnail_id,
                    post.blog_content,
                    post.project_title,
                    post.project_content,
                    post.normal_content,
                ],
            )?;

            for m in media {
                tx.execute(
                    "INSERT INTO post_media (id, post_id, media_type, file_id, uploaded_at, sort_order)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        Uuid::new_v4().to_string(),
                        post.id,
                        m.media_type,
                        m.file_id,
                        stamp,
                        m.sort_order
                    ],
                )?;
            }

            for link in links {
                tx.execute(
                    "INSERT INTO project_links (id, post_id, title, url, sort_order)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        Uuid::new_v4().to_string(),
                        post.id,
                        link.title,
                        link.url,
                        link.sort_order
                    ],
                )?;
            }

            tx.commit()?;
            debug!(
                "Created {} feed post {} ({} media, {} links)",
                post.post_type,
                post.id,
                media.len(),
                links.len()
            );
            Ok(())
        })
    }

    pub fn get_feed_post(&self, id: &str, active_only: bool) -> Result<Option<FeedPostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE p.id = ?1 {}",
                FEED_POST_SELECT,
                if active_only { "AND p.is_active = 1" } else { "" }
            );
            conn.query_row(&sql, [id], map_feed_post).optional()
        })
    }

    /// Active feed posts, pinned first, then newest.
    pub fn list_feed_posts(&self, limit: u32, offset: u32) -> Result<Vec<FeedPostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE p.is_active = 1
                 ORDER BY p.is_pinned DESC, p.created_at DESC, p.rowid DESC
                 LIMIT ?1 OFFSET ?2",
                FEED_POST_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit, offset], map_feed_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_feed_post(&self, id: &str, author_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM feed_posts WHERE id = ?1 AND author_id = ?2",
                (id, author_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Media per post id, ordered by (order, uploaded_at).
    pub fn media_for_posts(&self, post_ids: &[String]) -> Result<HashMap<String, Vec<PostMediaRow>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, post_id, media_type, file_id, uploaded_at, sort_order FROM post_media
                 WHERE post_id IN ({}) ORDER BY sort_order, uploaded_at, rowid",
                placeholders(post_ids.len(), 0)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(post_ids), |row| {
                Ok(PostMediaRow {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    media_type: row.get(2)?,
                    file_id: row.get(3)?,
                    uploaded_at: row.get(4)?,
                    sort_order: row.get(5)?,
                })
            })?;
            let mut grouped: HashMap<String, Vec<PostMediaRow>> = HashMap::new();
            for row in rows {
                let row = row?;
                grouped.entry(row.post_id.clone()).or_default().push(row);
            }
            Ok(grouped)
        })
    }

    /// Project links per post id, ordered by their slot.
    pub fn links_for_posts(&self, post_ids: &[String]) -> Result<HashMap<String, Vec<ProjectLinkRow>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, post_id, title, url, sort_order FROM project_links
                 WHERE post_id IN ({}) ORDER BY sort_order, rowid",
                placeholders(post_ids.len(), 0)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(post_ids), |row| {
                Ok(ProjectLinkRow {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    title: row.get(2)?,
                    url: row.get(3)?,
                    sort_order: row.get(4)?,
                })
            })?;
            let mut grouped: HashMap<String, Vec<ProjectLinkRow>> = HashMap::new();
            for row in rows {
                let row = row?;
                grouped.entry(row.post_id.clone()).or_default().push(row);
            }
            Ok(grouped)
        })
    }
}

fn map_feed_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedPostRow> {
    Ok(FeedPostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "unknown".to_string()),
        post_type: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        is_pinned: row.get(6)?,
        is_active: row.get(7)?,
        views_count: row.get(8)?,
        blog_title: row.get(9)?,
        blog_thumbnail_id: row.get(10)?,
        blog_content: row.get(11)?,
        project_title: row.get(12)?,
        project_content: row.get(13)?,
        normal_content: row.get(14)?,
        likes_count: row.get(15)?,
        comments_count: row.get(16)?,
    })
}
