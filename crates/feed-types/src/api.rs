use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FeedPostType, MediaType, PostType};

// -- JWT Claims --

/// JWT claims issued by the auth endpoints and checked by the API middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Blogs and uploads --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBlogRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub media_id: Uuid,
    pub content_type: String,
    pub size: u64,
}

// -- Legacy posts --

/// Body of the legacy create/edit post form. Every field is optional at the
/// wire level; the form layer decides what is required.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostRequest {
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<Uuid>,
    #[serde(default)]
    pub video: Option<Uuid>,
    #[serde(default)]
    pub blog: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub post_type: PostType,
    pub content: String,
    pub excerpt: String,
    pub image: Option<Uuid>,
    pub video: Option<Uuid>,
    pub blog: Option<BlogRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_pinned: bool,
    pub views_count: u64,
    pub likes_count: u64,
    pub comments_count: u64,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub liked: bool,
    pub saved: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<PostView>,
    pub active_hashtag: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserPostsResponse {
    pub profile_username: String,
    pub posts: Vec<PostView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub post: PostView,
    pub comments: Vec<CommentView>,
    pub user_liked: bool,
    pub user_saved: bool,
    pub user_liked_comments: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HashTagView {
    pub name: String,
    pub posts_count: u64,
}

// -- Comments (both generations) --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_edited: bool,
    pub likes_count: u64,
    pub liked: bool,
    pub replies: Vec<CommentView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedCommentResponse {
    pub deleted: Uuid,
    pub post_id: Uuid,
}

// -- Toggles --

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleLikeResponse {
    pub liked: bool,
    pub likes_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleSaveResponse {
    pub saved: bool,
}

/// New-generation toggles also carry a `success` flag for the AJAX callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedToggleLikeResponse {
    pub success: bool,
    pub liked: bool,
    pub likes_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedToggleSaveResponse {
    pub success: bool,
    pub saved: bool,
}

// -- Unified feed posts --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlogPostRequest {
    #[serde(default)]
    pub blog_title: Option<String>,
    #[serde(default)]
    pub blog_content: Option<String>,
    #[serde(default)]
    pub blog_thumbnail: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectPostRequest {
    #[serde(default)]
    pub project_title: Option<String>,
    #[serde(default)]
    pub project_content: Option<String>,
    #[serde(default)]
    pub link_title_1: Option<String>,
    #[serde(default)]
    pub link_url_1: Option<String>,
    #[serde(default)]
    pub link_title_2: Option<String>,
    #[serde(default)]
    pub link_url_2: Option<String>,
    #[serde(default)]
    pub link_title_3: Option<String>,
    #[serde(default)]
    pub link_url_3: Option<String>,
    #[serde(default)]
    pub media: Vec<Uuid>,
}

impl ProjectPostRequest {
    /// The three (title, url) link slots, numbered from 1.
    pub fn link_slots(&self) -> [(u32, Option<&str>, Option<&str>); 3] {
        [
            (1, self.link_title_1.as_deref(), self.link_url_1.as_deref()),
            (2, self.link_title_2.as_deref(), self.link_url_2.as_deref()),
            (3, self.link_title_3.as_deref(), self.link_url_3.as_deref()),
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalPostRequest {
    #[serde(default)]
    pub normal_content: Option<String>,
    #[serde(default)]
    pub media: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaView {
    pub id: Uuid,
    pub media_type: MediaType,
    pub file: Uuid,
    pub order: u32,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectLinkView {
    pub title: String,
    pub url: String,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPostView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub post_type: FeedPostType,
    pub title: Option<String>,
    pub content: Option<String>,
    pub blog_thumbnail: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_pinned: bool,
    pub views_count: u64,
    pub media: Vec<MediaView>,
    pub project_links: Vec<ProjectLinkView>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub is_liked_by_user: bool,
    pub is_saved_by_user: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedListResponse {
    pub posts: Vec<FeedPostView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedPostDetailResponse {
    pub post: FeedPostView,
    pub comments: Vec<CommentView>,
    pub user_has_liked: bool,
    pub user_has_saved: bool,
}
