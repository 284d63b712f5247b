use anyhow::Result;
use rusqlite::params_from_iter;

use super::{OptionalExt, placeholders};
use crate::models::{BlogRow, UploadRow};
use crate::{Database, now};

impl Database {
    // -- Blogs --

    pub fn create_blog(&self, id: &str, author_id: &str, title: &str) -> Result<BlogRow> {
        let created_at = now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blogs (id, author_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, author_id, title, &created_at),
            )?;
            Ok(())
        })?;
        Ok(BlogRow {
            id: id.to_string(),
            author_id: author_id.to_string(),
            title: title.to_string(),
            created_at,
        })
    }

    pub fn get_blogs_by_author(&self, author_id: &str) -> Result<Vec<BlogRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, title, created_at FROM blogs
                 WHERE author_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([author_id], |row| {
                    Ok(BlogRow {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        title: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Which of `blog_ids` belong to `author_id`.
    pub fn owned_blog_ids(&self, author_id: &str, blog_ids: &[String]) -> Result<Vec<String>> {
        if blog_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id FROM blogs WHERE author_id = ?1 AND id IN ({})",
                placeholders(blog_ids.len(), 1)
            );
            let mut stmt = conn.prepare(&sql)?;
            let params = std::iter::once(author_id).chain(blog_ids.iter().map(String::as_str));
            let ids = stmt
                .query_map(params_from_iter(params), |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    // -- Uploads --

    pub fn insert_upload(
        &self,
        id: &str,
        uploader_id: &str,
        content_type: &str,
        size: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO uploads (id, uploader_id, content_type, size, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, uploader_id, content_type, size, now()],
            )?;
            Ok(())
        })
    }

    pub fn get_upload(&self, id: &str) -> Result<Option<UploadRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, uploader_id, content_type, size, created_at FROM uploads WHERE id = ?1",
                [id],
                map_upload,
            )
            .optional()
        })
    }

    /// The subset of `upload_ids` uploaded by `uploader_id`.
    pub fn owned_uploads(&self, uploader_id: &str, upload_ids: &[String]) -> Result<Vec<UploadRow>> {
        if upload_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, uploader_id, content_type, size, created_at FROM uploads
                 WHERE uploader_id = ?1 AND id IN ({})",
                placeholders(upload_ids.len(), 1)
            );
            let mut stmt = conn.prepare(&sql)?;
            let params = std::iter::once(uploader_id).chain(upload_ids.iter().map(String::as_str));
            let rows = stmt
                .query_map(params_from_iter(params), map_upload)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_upload(row: &rusqlite::Row<'_>) -> rusqlite::Result<UploadRow> {
    Ok(UploadRow {
        id: row.get(0)?,
        uploader_id: row.get(1)?,
        content_type: row.get(2)?,
        size: row.get(3)?,
        created_at: row.get(4)?,
    })
}
