//! Form validation for every write endpoint.
//!
//! Each `clean_*` function takes the raw request plus whatever it needs to
//! resolve references, and returns either the cleaned values or a field error
//! map. Cross-field errors are reported under [`NON_FIELD_ERRORS`].

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use url::{Host, Url};
use uuid::Uuid;

use feed_types::api::{BlogPostRequest, CommentRequest, NormalPostRequest, PostRequest, ProjectPostRequest};
use feed_types::models::{MediaType, PostType};

pub const NON_FIELD_ERRORS: &str = "__all__";

/// Maximum number of images/videos attached to one feed post.
pub const MAX_MEDIA_FILES: usize = 5;

const TITLE_MAX_CHARS: usize = 255;
const LINK_TITLE_MAX_CHARS: usize = 100;

const REQUIRED: &str = "This field is required.";

/// Field name -> list of messages.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

/// Uploads and blogs owned by the current user, keyed by id. Built by the
/// handler from the ids a request references, so validation stays pure.
#[derive(Debug, Default)]
pub struct OwnedRefs {
    uploads: HashMap<Uuid, String>,
    blogs: HashSet<Uuid>,
}

impl OwnedRefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_upload(&mut self, id: Uuid, content_type: impl Into<String>) {
        self.uploads.insert(id, content_type.into());
    }

    pub fn add_blog(&mut self, id: Uuid) {
        self.blogs.insert(id);
    }

    /// `None` when the upload is not the user's; `Some(None)` when it is but
    /// is neither an image nor a video.
    fn media_type(&self, id: &Uuid) -> Option<Option<MediaType>> {
        self.uploads.get(id).map(|ct| MediaType::from_content_type(ct))
    }

    fn owns_blog(&self, id: &Uuid) -> bool {
        self.blogs.contains(id)
    }
}

// -- Cleaned values --

#[derive(Debug, PartialEq)]
pub struct CleanPost {
    pub post_type: PostType,
    pub content: String,
    pub image: Option<Uuid>,
    pub video: Option<Uuid>,
    pub blog: Option<Uuid>,
}

#[derive(Debug, PartialEq)]
pub struct CleanBlogPost {
    pub title: String,
    pub content: String,
    pub thumbnail: Option<Uuid>,
}

#[derive(Debug, PartialEq)]
pub struct CleanLink {
    pub title: String,
    pub url: String,
    pub order: u32,
}

#[derive(Debug, PartialEq)]
pub struct CleanMedia {
    pub file: Uuid,
    pub media_type: MediaType,
    pub order: u32,
}

#[derive(Debug, PartialEq)]
pub struct CleanProjectPost {
    pub title: String,
    pub content: String,
    pub links: Vec<CleanLink>,
    pub media: Vec<CleanMedia>,
}

#[derive(Debug, PartialEq)]
pub struct CleanNormalPost {
    pub content: String,
    pub media: Vec<CleanMedia>,
}

// -- Field helpers --

/// Trimmed text, or None when blank.
fn stripped(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// The raw text when it has any non-whitespace content.
fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}

fn check_max_chars(errors: &mut FormErrors, field: &str, value: &str, max: usize) -> bool {
    let n = value.chars().count();
    if n > max {
        errors.add(
            field,
            format!("Ensure this value has at most {} characters (it has {}).", max, n),
        );
        false
    } else {
        true
    }
}

/// URL field cleaning: a missing scheme defaults to http, and the host must
/// look like a real domain, `localhost`, or an IP address.
pub fn clean_url(raw: &str) -> Result<String, &'static str> {
    const INVALID: &str = "Enter a valid URL.";

    let raw = raw.trim();
    // Only a value without any scheme gets http:// assumed
    let candidate = match Url::parse(raw) {
        Ok(_) => raw.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => format!("http://{}", raw),
        Err(_) => return Err(INVALID),
    };
    let parsed = Url::parse(&candidate).map_err(|_| INVALID)?;
    if !matches!(parsed.scheme(), "http" | "https" | "ftp" | "ftps") {
        return Err(INVALID);
    }
    match parsed.host() {
        Some(Host::Domain(d)) if d.contains('.') || d == "localhost" => Ok(candidate),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => Ok(candidate),
        _ => Err(INVALID),
    }
}

fn clean_media(errors: &mut FormErrors, ids: &[Uuid], refs: &OwnedRefs) -> Vec<CleanMedia> {
    let mut media = Vec::new();
    for (index, id) in ids.iter().enumerate() {
        match refs.media_type(id) {
            None => errors.add("media", format!("Select a valid media file. {} is not one of your uploads.", id)),
            // unsupported types are skipped, keeping the gap in ordering
            Some(None) => {}
            Some(Some(media_type)) => media.push(CleanMedia {
                file: *id,
                media_type,
                order: index as u32,
            }),
        }
    }
    media
}

// -- Forms --

/// Legacy post form: type-specific required attachments.
pub fn clean_post(req: &PostRequest, refs: &OwnedRefs) -> Result<CleanPost, FormErrors> {
    let mut errors = FormErrors::default();

    let post_type = match req.post_type.as_deref().map(str::trim) {
        None | Some("") => Some(PostType::default()),
        Some(raw) => match raw.parse::<PostType>() {
            Ok(t) => Some(t),
            Err(_) => {
                errors.add(
                    "post_type",
                    format!("Select a valid choice. {} is not one of the available choices.", raw),
                );
                None
            }
        },
    };

    let content = stripped(req.content.as_deref());
    if content.is_none() {
        errors.add("content", REQUIRED);
    }

    let image = req.image.filter(|id| {
        let ok = refs.media_type(id) == Some(Some(MediaType::Image));
        if !ok {
            errors.add(
                "image",
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            );
        }
        ok
    });

    let video = req.video.filter(|id| {
        let ok = refs.media_type(id) == Some(Some(MediaType::Video));
        if !ok {
            errors.add("video", "Upload a valid video.");
        }
        ok
    });

    let blog = req.blog.filter(|id| {
        let ok = refs.owns_blog(id);
        if !ok {
            errors.add(
                "blog",
                "Select a valid choice. That choice is not one of the available choices.",
            );
        }
        ok
    });

    match post_type {
        Some(PostType::Text) if content.is_none() => {
            errors.add(NON_FIELD_ERRORS, "Text posts must have content.")
        }
        Some(PostType::Image) if image.is_none() => {
            errors.add(NON_FIELD_ERRORS, "Image posts must have an image.")
        }
        Some(PostType::Video) if video.is_none() => {
            errors.add(NON_FIELD_ERRORS, "Video posts must have a video.")
        }
        Some(PostType::Blog) if blog.is_none() => {
            errors.add(NON_FIELD_ERRORS, "Blog posts must be linked to a blog.")
        }
        _ => {}
    }

    errors.finish(|| CleanPost {
        post_type: post_type.unwrap_or_default(),
        content: content.unwrap_or_default(),
        image,
        video,
        blog,
    })
}

/// Comment and reply form. Replies get their own wording.
pub fn clean_comment(req: &CommentRequest, is_reply: bool) -> Result<String, FormErrors> {
    let mut errors = FormErrors::default();
    let content = stripped(req.content.as_deref());
    if content.is_none() {
        errors.add(
            "content",
            if is_reply { "Reply cannot be empty." } else { "Comment cannot be empty." },
        );
    }
    errors.finish(|| content.unwrap_or_default())
}

pub fn clean_blog_post(req: &BlogPostRequest, refs: &OwnedRefs) -> Result<CleanBlogPost, FormErrors> {
    let mut errors = FormErrors::default();

    let title = stripped(req.blog_title.as_deref());
    match &title {
        None => errors.add("blog_title", "Blog title is required."),
        Some(t) => {
            check_max_chars(&mut errors, "blog_title", t, TITLE_MAX_CHARS);
        }
    }

    // HTML bodies keep their whitespace
    let content = non_blank(req.blog_content.as_deref());
    if content.is_none() {
        errors.add("blog_content", "Blog content is required.");
    }

    let thumbnail = req.blog_thumbnail.filter(|id| {
        let ok = refs.media_type(id) == Some(Some(MediaType::Image));
        if !ok {
            errors.add(
                "blog_thumbnail",
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            );
        }
        ok
    });

    errors.finish(|| CleanBlogPost {
        title: title.unwrap_or_default(),
        content: content.unwrap_or_default(),
        thumbnail,
    })
}

/// Project form: title, HTML description, up to three (title, url) pairs
/// where each half of a pair requires the other, and attached media.
pub fn clean_project_post(req: &ProjectPostRequest, refs: &OwnedRefs) -> Result<CleanProjectPost, FormErrors> {
    let mut errors = FormErrors::default();

    let title = stripped(req.project_title.as_deref());
    match &title {
        None => errors.add("project_title", "Project name is required."),
        Some(t) => {
            check_max_chars(&mut errors, "project_title", t, TITLE_MAX_CHARS);
        }
    }

    let content = non_blank(req.project_content.as_deref());
    if content.is_none() {
        errors.add("project_content", "Project description is required.");
    }

    let mut links = Vec::new();
    for (slot, raw_title, raw_url) in req.link_slots() {
        let title_key = format!("link_title_{}", slot);
        let url_key = format!("link_url_{}", slot);

        let link_title = stripped(raw_title)
            .filter(|t| check_max_chars(&mut errors, &title_key, t, LINK_TITLE_MAX_CHARS));
        let link_url = stripped(raw_url).and_then(|u| match clean_url(&u) {
            Ok(url) => Some(url),
            Err(msg) => {
                errors.add(&url_key, msg);
                None
            }
        });

        match (link_title, link_url) {
            (Some(title), Some(url)) => links.push(CleanLink { title, url, order: slot }),
            (Some(_), None) => errors.add(&url_key, "URL is required when title is provided."),
            (None, Some(_)) => errors.add(&title_key, "Title is required when URL is provided."),
            (None, None) => {}
        }
    }

    let media = clean_media(&mut errors, &req.media, refs);

    errors.finish(|| CleanProjectPost {
        title: title.unwrap_or_default(),
        content: content.unwrap_or_default(),
        links,
        media,
    })
}

pub fn clean_normal_post(req: &NormalPostRequest, refs: &OwnedRefs) -> Result<CleanNormalPost, FormErrors> {
    let mut errors = FormErrors::default();

    let content = stripped(req.normal_content.as_deref());
    if content.is_none() {
        errors.add("normal_content", "Post content is required.");
    }

    let media = clean_media(&mut errors, &req.media, refs);

    errors.finish(|| CleanNormalPost {
        content: content.unwrap_or_default(),
        media,
    })
}
