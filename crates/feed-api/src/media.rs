use axum::{
    Extension,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use feed_types::api::{BlogResponse, Claims, CreateBlogRequest, UploadResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, RawBody};
use crate::render::parse_time;
use crate::run_db;

/// 50 MB upload limit for media files
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const BLOG_TITLE_MAX_CHARS: usize = 255;

/// POST /media: stores the raw body under the upload directory and records
/// its content type, so posts can reference it by id.
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    RawBody(bytes): RawBody,
) -> ApiResult<impl IntoResponse> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty upload.".into()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let media_id = Uuid::new_v4();
    let size = bytes.len() as i64;

    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!("Failed to create upload directory {}: {}", state.upload_dir.display(), e);
        anyhow::Error::from(e)
    })?;

    let file_path = state.upload_dir.join(media_id.to_string());
    let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
        error!("Failed to create file {}: {}", file_path.display(), e);
        anyhow::Error::from(e)
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", file_path.display(), e);
        anyhow::Error::from(e)
    })?;

    let uploader = claims.sub.to_string();
    let ct = content_type.clone();
    let recorded = run_db(&state, move |db| {
        db.insert_upload(&media_id.to_string(), &uploader, &ct, size)?;
        Ok(())
    })
    .await;
    if let Err(e) = recorded {
        if let Err(rm) = tokio::fs::remove_file(&file_path).await {
            warn!("Failed to remove unrecorded upload {}: {}", file_path.display(), rm);
        }
        return Err(e);
    }

    debug!("Stored upload {} ({}, {} bytes)", media_id, content_type, size);
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            media_id,
            content_type,
            size: size as u64,
        }),
    ))
}

/// GET /media/{id}: the stored bytes with their recorded content type.
pub async fn download_media(
    State(state): State<AppState>,
    Path(media_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = media_id.to_string();
    let upload = run_db(&state, move |db| Ok(db.get_upload(&id)?))
        .await?
        .ok_or(ApiError::NotFound)?;

    // Path<Uuid> keeps the file name free of separators
    let file_path = state.upload_dir.join(media_id.to_string());
    let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
        error!("Failed to read file {}: {}", file_path.display(), e);
        ApiError::NotFound
    })?;

    Ok(([(header::CONTENT_TYPE, upload.content_type)], bytes))
}

pub async fn create_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBlogRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Blog title is required.".into()));
    }
    if title.chars().count() > BLOG_TITLE_MAX_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Blog title must be at most {} characters.",
            BLOG_TITLE_MAX_CHARS
        )));
    }

    let blog_id = Uuid::new_v4();
    let author = claims.sub.to_string();
    let row = run_db(&state, move |db| Ok(db.create_blog(&blog_id.to_string(), &author, &title)?)).await?;

    Ok((
        StatusCode::CREATED,
        Json(BlogResponse {
            id: blog_id,
            title: row.title,
            created_at: parse_time(&row.created_at, "created_at"),
        }),
    ))
}

/// The caller's blogs, newest first.
pub async fn list_blogs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let author = claims.sub.to_string();
    let rows = run_db(&state, move |db| Ok(db.get_blogs_by_author(&author)?)).await?;

    let blogs: Vec<BlogResponse> = rows
        .into_iter()
        .map(|row| BlogResponse {
            id: crate::render::parse_uuid(&row.id, "blog id"),
            title: row.title,
            created_at: parse_time(&row.created_at, "created_at"),
        })
        .collect();
    Ok(Json(blogs))
}
