mod assets;
mod comments;
mod engagement;
mod feed_posts;
mod posts;
mod users;

pub use comments::MAX_THREAD_DEPTH;
pub use posts::PostFilter;

/// The two coexisting post schemas. Comments, likes and saves have the same
/// shape in both; only the table names differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// `posts` and friends, served under `/old`.
    Legacy,
    /// `feed_posts` and the `*_new` tables.
    Current,
}

impl Generation {
    pub(crate) fn posts(self) -> &'static str {
        match self {
            Self::Legacy => "posts",
            Self::Current => "feed_posts",
        }
    }

    pub(crate) fn comments(self) -> &'static str {
        match self {
            Self::Legacy => "comments",
            Self::Current => "post_comments",
        }
    }

    pub(crate) fn post_likes(self) -> &'static str {
        match self {
            Self::Legacy => "post_likes",
            Self::Current => "post_likes_new",
        }
    }

    pub(crate) fn comment_likes(self) -> &'static str {
        match self {
            Self::Legacy => "comment_likes",
            Self::Current => "comment_likes_new",
        }
    }

    pub(crate) fn saves(self) -> &'static str {
        match self {
            Self::Legacy => "saved_posts",
            Self::Current => "saved_posts_new",
        }
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> anyhow::Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> anyhow::Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// `?1, ?2, ...` placeholders for an IN list, starting after `offset` bound params.
pub(crate) fn placeholders(count: usize, offset: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i + offset))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::Database;
    use crate::models::NewPost;
    use uuid::Uuid;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, name, "hash").unwrap();
        id
    }

    pub fn legacy_post(db: &Database, author: &str, content: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_post(
            &NewPost {
                id: &id,
                author_id: author,
                post_type: "text",
                content,
                image_id: None,
                video_id: None,
                blog_id: None,
            },
            &[],
            &[],
        )
        .unwrap();
        id
    }
}
