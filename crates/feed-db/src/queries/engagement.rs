use std::collections::HashSet;

use anyhow::Result;
use rusqlite::{Connection, params_from_iter};
use uuid::Uuid;

use super::{Generation, OptionalExt, placeholders};
use crate::{Database, now};

impl Database {
    /// Toggle the caller's like on a post: removes if it exists, inserts if not.
    /// Returns (liked, likes_count) after the change.
    pub fn toggle_post_like(&self, generation: Generation, post_id: &str, user_id: &str) -> Result<(bool, i64)> {
        let table = generation.post_likes();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let liked = toggle_row(&tx, table, "post_id", post_id, user_id, "created_at")?;
            let count = count_rows(&tx, table, "post_id", post_id)?;
            tx.commit()?;
            Ok((liked, count))
        })
    }

    /// Same as [`Database::toggle_post_like`] for a comment.
    pub fn toggle_comment_like(&self, generation: Generation, comment_id: &str, user_id: &str) -> Result<(bool, i64)> {
        let table = generation.comment_likes();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let liked = toggle_row(&tx, table, "comment_id", comment_id, user_id, "created_at")?;
            let count = count_rows(&tx, table, "comment_id", comment_id)?;
            tx.commit()?;
            Ok((liked, count))
        })
    }

    /// Toggle a bookmark. Returns whether the post is saved afterwards.
    pub fn toggle_save(&self, generation: Generation, post_id: &str, user_id: &str) -> Result<bool> {
        let table = generation.saves();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let saved = toggle_row(&tx, table, "post_id", post_id, user_id, "saved_at")?;
            tx.commit()?;
            Ok(saved)
        })
    }

    /// Of `post_ids`, the ones `user_id` has liked.
    pub fn liked_post_ids(&self, generation: Generation, user_id: &str, post_ids: &[String]) -> Result<HashSet<String>> {
        self.with_conn(|conn| user_targets(conn, generation.post_likes(), "post_id", user_id, post_ids))
    }

    /// Of `post_ids`, the ones `user_id` has saved.
    pub fn saved_post_ids(&self, generation: Generation, user_id: &str, post_ids: &[String]) -> Result<HashSet<String>> {
        self.with_conn(|conn| user_targets(conn, generation.saves(), "post_id", user_id, post_ids))
    }

    /// Of `comment_ids`, the ones `user_id` has liked.
    pub fn liked_comment_ids(
        &self,
        generation: Generation,
        user_id: &str,
        comment_ids: &[String],
    ) -> Result<HashSet<String>> {
        self.with_conn(|conn| user_targets(conn, generation.comment_likes(), "comment_id", user_id, comment_ids))
    }

    pub fn post_exists(&self, generation: Generation, post_id: &str, active_only: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT 1 FROM {} WHERE id = ?1 {}",
                generation.posts(),
                if active_only { "AND is_active = 1" } else { "" }
            );
            Ok(conn.query_row(&sql, [post_id], |_| Ok(())).optional()?.is_some())
        })
    }

    /// Bump a post's view counter.
    pub fn increment_views(&self, generation: Generation, post_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "UPDATE {} SET views_count = views_count + 1 WHERE id = ?1",
                    generation.posts()
                ),
                [post_id],
            )?;
            Ok(())
        })
    }
}

/// Delete the (target, user) row if present, insert it otherwise.
/// Returns true when the row exists afterwards.
fn toggle_row(
    conn: &Connection,
    table: &str,
    target_col: &str,
    target_id: &str,
    user_id: &str,
    stamp_col: &str,
) -> Result<bool> {
    let existing: Option<String> = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE {} = ?1 AND user_id = ?2", table, target_col),
            (target_id, user_id),
            |row| row.get(0),
        )
        .optional()?;

    if let Some(existing_id) = existing {
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), [&existing_id])?;
        Ok(false)
    } else {
        conn.execute(
            &format!(
                "INSERT INTO {} (id, {}, user_id, {}) VALUES (?1, ?2, ?3, ?4)",
                table, target_col, stamp_col
            ),
            (Uuid::new_v4().to_string(), target_id, user_id, now()),
        )?;
        Ok(true)
    }
}

fn count_rows(conn: &Connection, table: &str, target_col: &str, target_id: &str) -> Result<i64> {
    Ok(conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", table, target_col),
        [target_id],
        |row| row.get(0),
    )?)
}

fn user_targets(
    conn: &Connection,
    table: &str,
    target_col: &str,
    user_id: &str,
    target_ids: &[String],
) -> Result<HashSet<String>> {
    if target_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let sql = format!(
        "SELECT {col} FROM {table} WHERE user_id = ?1 AND {col} IN ({})",
        placeholders(target_ids.len(), 1),
        col = target_col,
        table = table,
    );
    let mut stmt = conn.prepare(&sql)?;
    let params = std::iter::once(user_id).chain(target_ids.iter().map(String::as_str));
    let ids = stmt
        .query_map(params_from_iter(params), |row| row.get(0))?
        .collect::<std::result::Result<HashSet<String>, _>>()?;
    Ok(ids)
}
