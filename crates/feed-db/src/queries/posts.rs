use std::collections::HashMap;

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use super::{OptionalExt, placeholders};
use crate::models::{HashTagRow, NewPost, PostChanges, PostRow};
use crate::{Database, now};

/// Which legacy posts to list and how to order them.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Only posts tagged with this (already lower-cased) hashtag name.
    pub hashtag: Option<String>,
    pub author_id: Option<String>,
    /// Only posts saved by this user.
    pub saved_by: Option<String>,
    /// Pinned posts sort ahead of newer unpinned ones (the main feed).
    pub pinned_first: bool,
    pub limit: u32,
    pub offset: u32,
}

const POST_SELECT: &str = "
    SELECT p.id, p.author_id, u.username, p.post_type, p.content,
           p.image_id, p.video_id, p.blog_id, b.title,
           p.created_at, p.updated_at, p.is_pinned, p.is_active, p.views_count,
           (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
    FROM posts p
    LEFT JOIN users u ON u.id = p.author_id
    LEFT JOIN blogs b ON b.id = p.blog_id";

impl Database {
    /// Insert a post and attach its hashtags and mentions in one transaction.
    pub fn insert_post(
        &self,
        post: &NewPost<'_>,
        hashtags: &[String],
        mentions: &[String],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let stamp = now();
            tx.execute(
                "INSERT INTO posts (id, author_id, post_type, content, image_id, video_id, blog_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    post.id,
                    post.author_id,
                    post.post_type,
                    post.content,
                    post.image_id,
                    post.video_id,
                    post.blog_id,
                    stamp,
                ],
            )?;
            sync_tags(&tx, post.id, hashtags, mentions)?;
            tx.commit()?;
            debug!("Created post {} ({} tags, {} mentions)", post.id, hashtags.len(), mentions.len());
            Ok(())
        })
    }

    /// Rewrite an author's post and re-sync its tags. Returns false when the
    /// post does not exist or belongs to someone else.
    pub fn update_post(
        &self,
        id: &str,
        author_id: &str,
        changes: &PostChanges<'_>,
        hashtags: &[String],
        mentions: &[String],
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE posts
                 SET post_type = ?1, content = ?2, image_id = ?3, video_id = ?4, blog_id = ?5, updated_at = ?6
                 WHERE id = ?7 AND author_id = ?8",
                rusqlite::params![
                    changes.post_type,
                    changes.content,
                    changes.image_id,
                    changes.video_id,
                    changes.blog_id,
                    now(),
                    id,
                    author_id,
                ],
            )?;
            if updated == 0 {
                return Ok(false);
            }
            sync_tags(&tx, id, hashtags, mentions)?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_post(&self, id: &str, active_only: bool) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE p.id = ?1 {}",
                POST_SELECT,
                if active_only { "AND p.is_active = 1" } else { "" }
            );
            conn.query_row(&sql, [id], map_post).optional()
        })
    }

    pub fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, filter))
    }

    /// Hard-delete a post owned by `author_id`; dependents go with it.
    pub fn delete_post(&self, id: &str, author_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND author_id = ?2",
                (id, author_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Hashtag names per post id, alphabetical.
    pub fn hashtags_for_posts(&self, post_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        self.group_by_post(
            "SELECT ph.post_id, h.name FROM post_hashtags ph
             JOIN hashtags h ON h.id = ph.hashtag_id
             WHERE ph.post_id IN ({}) ORDER BY h.name",
            post_ids,
        )
    }

    /// Mentioned usernames per post id, alphabetical.
    pub fn mentions_for_posts(&self, post_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        self.group_by_post(
            "SELECT m.post_id, u.username FROM mentions m
             JOIN users u ON u.id = m.user_id
             WHERE m.post_id IN ({}) ORDER BY u.username",
            post_ids,
        )
    }

    fn group_by_post(&self, template: &str, post_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.with_conn(|conn| {
            let sql = template.replace("{}", &placeholders(post_ids.len(), 0));
            let mut stmt = conn.prepare(&sql)?;
            let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
            let rows = stmt.query_map(params_from_iter(post_ids), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (post_id, value) = row?;
                grouped.entry(post_id).or_default().push(value);
            }
            Ok(grouped)
        })
    }

    /// Every hashtag with the number of posts carrying it, by name.
    pub fn list_hashtags(&self) -> Result<Vec<HashTagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT h.name, COUNT(ph.post_id) FROM hashtags h
                 LEFT JOIN post_hashtags ph ON ph.hashtag_id = h.id
                 GROUP BY h.id ORDER BY h.name",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(HashTagRow {
                        name: row.get(0)?,
                        posts_count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_posts(conn: &Connection, filter: &PostFilter) -> Result<Vec<PostRow>> {
    let mut sql = format!("{} WHERE p.is_active = 1", POST_SELECT);
    let mut params: Vec<Value> = Vec::new();

    if let Some(tag) = &filter.hashtag {
        params.push(Value::Text(tag.clone()));
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM post_hashtags ph JOIN hashtags h ON h.id = ph.hashtag_id
                          WHERE ph.post_id = p.id AND h.name = ?{})",
            params.len()
        ));
    }
    if let Some(author) = &filter.author_id {
        params.push(Value::Text(author.clone()));
        sql.push_str(&format!(" AND p.author_id = ?{}", params.len()));
    }
    if let Some(user) = &filter.saved_by {
        params.push(Value::Text(user.clone()));
        sql.push_str(&format!(
            " AND p.id IN (SELECT s.post_id FROM saved_posts s WHERE s.user_id = ?{})",
            params.len()
        ));
    }

    sql.push_str(if filter.pinned_first {
        " ORDER BY p.is_pinned DESC, p.created_at DESC, p.rowid DESC"
    } else {
        " ORDER BY p.created_at DESC, p.rowid DESC"
    });

    params.push(Value::Integer(filter.limit.into()));
    params.push(Value::Integer(filter.offset.into()));
    sql.push_str(&format!(" LIMIT ?{} OFFSET ?{}", params.len() - 1, params.len()));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Replace a post's hashtag links and mentions. Hashtags are created on
/// first use; mentions of unknown usernames are ignored.
fn sync_tags(conn: &Connection, post_id: &str, hashtags: &[String], mentions: &[String]) -> Result<()> {
    conn.execute("DELETE FROM post_hashtags WHERE post_id = ?1", [post_id])?;
    conn.execute("DELETE FROM mentions WHERE post_id = ?1", [post_id])?;

    let stamp = now();
    for name in hashtags {
        conn.execute(
            "INSERT OR IGNORE INTO hashtags (id, name, created_at) VALUES (?1, ?2, ?3)",
            (Uuid::new_v4().to_string(), name, &stamp),
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO post_hashtags (hashtag_id, post_id)
             SELECT id, ?2 FROM hashtags WHERE name = ?1",
            (name, post_id),
        )?;
    }

    for username in mentions {
        conn.execute(
            "INSERT OR IGNORE INTO mentions (id, post_id, user_id, created_at)
             SELECT ?1, ?2, u.id, ?3 FROM users u WHERE u.username = ?4",
            (Uuid::new_v4().to_string(), post_id, &stamp, username),
        )?;
    }
    Ok(())
}

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "unknown".to_string()),
        post_type: row.get(3)?,
        content: row.get(4)?,
        image_id: row.get(5)?,
        video_id: row.get(6)?,
        blog_id: row.get(7)?,
        blog_title: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        is_pinned: row.get(11)?,
        is_active: row.get(12)?,
        views_count: row.get(13)?,
        likes_count: row.get(14)?,
        comments_count: row.get(15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil;

    fn feed(limit: u32) -> PostFilter {
        PostFilter {
            pinned_first: true,
            limit,
            ..Default::default()
        }
    }

    #[test]
    fn feed_lists_pinned_first_then_newest() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let first = testutil::legacy_post(&db, &alice, "first");
        let second = testutil::legacy_post(&db, &alice, "second");
        let third = testutil::legacy_post(&db, &alice, "third");
        db.with_conn(|conn| {
            conn.execute("UPDATE posts SET is_pinned = 1 WHERE id = ?1", [&first])?;
            Ok(())
        })
        .unwrap();

        let ids: Vec<String> = db.list_posts(&feed(10)).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first, third, second]);
    }

    #[test]
    fn inactive_posts_are_hidden() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let post = testutil::legacy_post(&db, &alice, "hidden");
        db.with_conn(|conn| {
            conn.execute("UPDATE posts SET is_active = 0 WHERE id = ?1", [&post])?;
            Ok(())
        })
        .unwrap();

        assert!(db.list_posts(&feed(10)).unwrap().is_empty());
        assert!(db.get_post(&post, true).unwrap().is_none());
        assert!(db.get_post(&post, false).unwrap().is_some());
    }

    #[test]
    fn hashtag_filter_and_tag_lookup() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        testutil::user(&db, "bob");
        let tagged = Uuid::new_v4().to_string();
        db.insert_post(
            &NewPost {
                id: &tagged,
                author_id: &alice,
                post_type: "text",
                content: "hi @bob #rust",
                image_id: None,
                video_id: None,
                blog_id: None,
            },
            &["rust".to_string()],
            &["bob".to_string(), "nobody".to_string()],
        )
        .unwrap();
        testutil::legacy_post(&db, &alice, "untagged");

        let filter = PostFilter {
            hashtag: Some("rust".into()),
            ..feed(10)
        };
        let posts = db.list_posts(&filter).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, tagged);

        let ids = vec![tagged.clone()];
        assert_eq!(db.hashtags_for_posts(&ids).unwrap()[&tagged], vec!["rust"]);
        assert_eq!(db.mentions_for_posts(&ids).unwrap()[&tagged], vec!["bob"]);

        let tags = db.list_hashtags().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].posts_count, 1);
    }

    #[test]
    fn update_resyncs_tags_and_checks_author() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let post = testutil::legacy_post(&db, &alice, "plain");
        let changes = PostChanges {
            post_type: "text",
            content: "now #tagged",
            image_id: None,
            video_id: None,
            blog_id: None,
        };

        assert!(!db.update_post(&post, &bob, &changes, &[], &[]).unwrap());
        assert!(db
            .update_post(&post, &alice, &changes, &["tagged".to_string()], &[])
            .unwrap());

        let row = db.get_post(&post, true).unwrap().unwrap();
        assert_eq!(row.content, "now #tagged");
        let ids = vec![post.clone()];
        assert_eq!(db.hashtags_for_posts(&ids).unwrap()[&post], vec!["tagged"]);
    }

    #[test]
    fn delete_requires_author_and_cascades() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let post = testutil::legacy_post(&db, &alice, "bye");
        db.toggle_post_like(crate::Generation::Legacy, &post, &bob).unwrap();

        assert!(!db.delete_post(&post, &bob).unwrap());
        assert!(db.delete_post(&post, &alice).unwrap());
        let likes: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM post_likes", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(likes, 0);
    }

    #[test]
    fn saved_and_author_filters() {
        let db = testutil::db();
        let alice = testutil::user(&db, "alice");
        let bob = testutil::user(&db, "bob");
        let a = testutil::legacy_post(&db, &alice, "a");
        let b = testutil::legacy_post(&db, &bob, "b");
        db.toggle_save(crate::Generation::Legacy, &b, &alice).unwrap();

        let by_alice = PostFilter {
            author_id: Some(alice.clone()),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(db.list_posts(&by_alice).unwrap()[0].id, a);

        let saved = PostFilter {
            saved_by: Some(alice.clone()),
            limit: 10,
            ..Default::default()
        };
        let rows = db.list_posts(&saved).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, b);
    }
}
