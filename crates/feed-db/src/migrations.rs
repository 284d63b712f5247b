use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, blogs, uploads, legacy posts)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE blogs (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE uploads (
                id            TEXT PRIMARY KEY,
                uploader_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content_type  TEXT NOT NULL,
                size          INTEGER NOT NULL,
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE posts (
                id           TEXT PRIMARY KEY,
                author_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_type    TEXT NOT NULL DEFAULT 'text'
                             CHECK (post_type IN ('text', 'image', 'video', 'blog')),
                content      TEXT NOT NULL,
                image_id     TEXT REFERENCES uploads(id) ON DELETE SET NULL,
                video_id     TEXT REFERENCES uploads(id) ON DELETE SET NULL,
                blog_id      TEXT REFERENCES blogs(id) ON DELETE SET NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at   TEXT NOT NULL DEFAULT (datetime('now')),
                is_pinned    INTEGER NOT NULL DEFAULT 0,
                is_active    INTEGER NOT NULL DEFAULT 1,
                views_count  INTEGER NOT NULL DEFAULT 0 CHECK (views_count >= 0)
            );

            CREATE INDEX idx_posts_created ON posts(created_at DESC);
            CREATE INDEX idx_posts_author ON posts(author_id, created_at DESC);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                parent_id   TEXT REFERENCES comments(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
                is_edited   INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);
            CREATE INDEX idx_comments_parent ON comments(parent_id);

            CREATE TABLE post_likes (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(post_id, user_id)
            );

            CREATE TABLE comment_likes (
                id          TEXT PRIMARY KEY,
                comment_id  TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(comment_id, user_id)
            );

            CREATE TABLE saved_posts (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                saved_at    TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(post_id, user_id)
            );

            CREATE TABLE hashtags (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE CHECK (length(name) <= 100),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE post_hashtags (
                hashtag_id  TEXT NOT NULL REFERENCES hashtags(id) ON DELETE CASCADE,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                PRIMARY KEY (hashtag_id, post_id)
            );

            CREATE INDEX idx_post_hashtags_post ON post_hashtags(post_id);

            CREATE TABLE mentions (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(post_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (unified feed posts)");
        conn.execute_batch(
            "
            CREATE TABLE feed_posts (
                id                 TEXT PRIMARY KEY,
                author_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_type          TEXT NOT NULL
                                   CHECK (post_type IN ('blog', 'project', 'normal')),
                created_at         TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at         TEXT NOT NULL DEFAULT (datetime('now')),
                is_pinned          INTEGER NOT NULL DEFAULT 0,
                is_active          INTEGER NOT NULL DEFAULT 1,
                views_count        INTEGER NOT NULL DEFAULT 0 CHECK (views_count >= 0),
                blog_title         TEXT,
                blog_thumbnail_id  TEXT REFERENCES uploads(id) ON DELETE SET NULL,
                blog_content       TEXT,
                project_title      TEXT,
                project_content    TEXT,
                normal_content     TEXT
            );

            CREATE INDEX idx_feed_posts_created ON feed_posts(created_at DESC);
            CREATE INDEX idx_feed_posts_author ON feed_posts(author_id, created_at DESC);
            CREATE INDEX idx_feed_posts_type ON feed_posts(post_type);

            CREATE TABLE post_media (
                id           TEXT PRIMARY KEY,
                post_id      TEXT NOT NULL REFERENCES feed_posts(id) ON DELETE CASCADE,
                media_type   TEXT NOT NULL CHECK (media_type IN ('image', 'video')),
                file_id      TEXT NOT NULL REFERENCES uploads(id) ON DELETE CASCADE,
                uploaded_at  TEXT NOT NULL DEFAULT (datetime('now')),
                sort_order   INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_post_media_post ON post_media(post_id, sort_order);

            CREATE TABLE project_links (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES feed_posts(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                url         TEXT NOT NULL,
                sort_order  INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_project_links_post ON project_links(post_id, sort_order);

            CREATE TABLE post_comments (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES feed_posts(id) ON DELETE CASCADE,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                parent_id   TEXT REFERENCES post_comments(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
                is_edited   INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_post_comments_post ON post_comments(post_id, created_at);
            CREATE INDEX idx_post_comments_parent ON post_comments(parent_id);

            CREATE TABLE post_likes_new (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES feed_posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(post_id, user_id)
            );

            CREATE TABLE comment_likes_new (
                id          TEXT PRIMARY KEY,
                comment_id  TEXT NOT NULL REFERENCES post_comments(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(comment_id, user_id)
            );

            CREATE TABLE saved_posts_new (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES feed_posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                saved_at    TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(post_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
