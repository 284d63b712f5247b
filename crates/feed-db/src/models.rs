/// Database row types. These map directly to SQLite rows and stay distinct
/// from the feed-types API models so the DB layer has no wire concerns.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct BlogRow {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub created_at: String,
}

pub struct UploadRow {
    pub id: String,
    pub uploader_id: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: String,
}

/// Legacy post joined with its author, linked blog and engagement counts.
pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub post_type: String,
    pub content: String,
    pub image_id: Option<String>,
    pub video_id: Option<String>,
    pub blog_id: Option<String>,
    pub blog_title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub is_pinned: bool,
    pub is_active: bool,
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
}

pub struct NewPost<'a> {
    pub id: &'a str,
    pub author_id: &'a str,
    pub post_type: &'a str,
    pub content: &'a str,
    pub image_id: Option<&'a str>,
    pub video_id: Option<&'a str>,
    pub blog_id: Option<&'a str>,
}

/// Fields rewritten by a legacy post edit.
pub struct PostChanges<'a> {
    pub post_type: &'a str,
    pub content: &'a str,
    pub image_id: Option<&'a str>,
    pub video_id: Option<&'a str>,
    pub blog_id: Option<&'a str>,
}

pub struct HashTagRow {
    pub name: String,
    pub posts_count: i64,
}

/// Comment of either generation, joined with its author and like count.
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub is_edited: bool,
    pub likes_count: i64,
}

pub struct FeedPostRow {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub post_type: String,
    pub created_at: String,
    pub updated_at: String,
    pub is_pinned: bool,
    pub is_active: bool,
    pub views_count: i64,
    pub blog_title: Option<String>,
    pub blog_thumbnail_id: Option<String>,
    pub blog_content: Option<String>,
    pub project_title: Option<String>,
    pub project_content: Option<String>,
    pub normal_content: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
}

#[derive(Default)]
pub struct NewFeedPost<'a> {
    pub id: &'a str,
    pub author_id: &'a str,
    pub post_type: &'a str,
    pub blog_title: Option<&'a str>,
    pub blog_thumbnail_id: Option<&'a str>,
    pub blog_content: Option<&'a str>,
    pub project_title: Option<&'a str>,
    pub project_content: Option<&'a str>,
    pub normal_content: Option<&'a str>,
}

pub struct PostMediaRow {
    pub id: String,
    pub post_id: String,
    pub media_type: String,
    pub file_id: String,
    pub uploaded_at: String,
    pub sort_order: i64,
}

pub struct NewMedia {
    pub file_id: String,
    pub media_type: String,
    pub sort_order: i64,
}

pub struct ProjectLinkRow {
    pub id: String,
    pub post_id: String,
    pub title: String,
    pub url: String,
    pub sort_order: i64,
}

pub struct NewLink {
    pub title: String,
    pub url: String,
    pub sort_order: i64,
}
