use anyhow::Result;
use rusqlite::Connection;

use super::{Generation, OptionalExt};
use crate::models::CommentRow;
use crate::{Database, now};

/// Most parent hops followed from a comment to its top-level comment. Reads
/// and writes share it, so a reply is accepted only if it will be shown.
pub const MAX_THREAD_DEPTH: usize = 64;

fn comment_select(generation: Generation) -> String {
    format!(
        "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.parent_id,
                c.created_at, c.updated_at, c.is_edited,
                (SELECT COUNT(*) FROM {likes} l WHERE l.comment_id = c.id)
         FROM {comments} c
         LEFT JOIN users u ON u.id = c.author_id",
        likes = generation.comment_likes(),
        comments = generation.comments(),
    )
}

impl Database {
    pub fn insert_comment(
        &self,
        generation: Generation,
        id: &str,
        post_id: &str,
        author_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, post_id, author_id, content, parent_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    generation.comments()
                ),
                rusqlite::params![id, post_id, author_id, content, parent_id, now()],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, generation: Generation, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", comment_select(generation));
            conn.query_row(&sql, [id], map_comment).optional()
        })
    }

    /// All comments of a post, oldest first, replies included.
    pub fn get_comments_for_post(&self, generation: Generation, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_comments(conn, generation, post_id))
    }

    /// Id of the top-level comment that `comment_id` ultimately replies to
    /// (itself when it is top-level). None for unknown ids or broken chains.
    pub fn thread_root(&self, generation: Generation, comment_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let sql = format!(
                "WITH RECURSIVE chain(id, parent_id, depth) AS (
                     SELECT id, parent_id, 0 FROM {table} WHERE id = ?1
                     UNION ALL
                     SELECT c.id, c.parent_id, chain.depth + 1
                     FROM {table} c JOIN chain ON c.id = chain.parent_id
                     WHERE chain.depth < ?2
                 )
                 SELECT id FROM chain WHERE parent_id IS NULL LIMIT 1",
                table = generation.comments()
            );
            conn.query_row(&sql, rusqlite::params![comment_id, MAX_THREAD_DEPTH as i64], |row| row.get(0))
                .optional()
        })
    }

    /// Rewrite an author's comment and flag it as edited.
    pub fn update_comment(&self, generation: Generation, id: &str, author_id: &str, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                &format!(
                    "UPDATE {} SET content = ?1, is_edited = 1, updated_at = ?2
                     WHERE id = ?3 AND author_id = ?4",
                    generation.comments()
                ),
                rusqlite::params![content, now(), id, author_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Delete an author's comment along with its replies and likes.
    pub fn delete_comment(&self, generation: Generation, id: &str, author_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1 AND author_id = ?2", generation.comments()),
                (id, author_id),
            )?;
            Ok(n > 0)
        })
    }
}

fn query_comments(conn: &Connection, generation: Generation, post_id: &str) -> Result<Vec<CommentRow>> {
    let sql = format!(
        "{} WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.rowid ASC",
        comment_select(generation)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([post_id], map_comment)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        content: row.get(4)?,
        parent_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        is_edited: row.get(8)?,
        likes_count: row.get(9)?,
    })
}
