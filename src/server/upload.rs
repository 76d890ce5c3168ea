use std::io::ErrorKind;
use std::path::PathBuf;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use time::OffsetDateTime;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::ApiError;

/// Multipart field that carries the image
pub const IMAGE_FIELD: &str = "image";

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// An image received from a client, not yet written anywhere
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A file written to the uploads directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub file_name: String,
    pub path: PathBuf,
    /// Path under which the server exposes the file
    pub url: String,
}

/// Writes uploads to a fixed directory as `<unix millis>-<original name>`
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `bytes` under a fresh name. An existing file is never overwritten:
    /// on a name clash a counter is inserted after the timestamp.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredUpload, ApiError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let millis = unix_millis();
        let name = sanitize_file_name(original_name);
        let mut attempt = 0u32;
        let (file_name, path, mut file) = loop {
            let file_name = if attempt == 0 {
                format!("{}-{}", millis, name)
            } else {
                format!("{}-{}-{}", millis, attempt, name)
            };
            let path = self.dir.join(&file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (file_name, path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        file.write_all(bytes).await?;
        file.flush().await?;
        debug!("Stored upload {} ({} bytes)", path.display(), bytes.len());

        Ok(StoredUpload {
            url: format!("/uploads/{}", file_name),
            file_name,
            path,
        })
    }
}

fn unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

/// Keep only the final path component and a conservative character set
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

/// Decode `data:<mime>;base64,<data>` or a bare base64 payload
pub fn decode_data_url(input: &str) -> Result<Vec<u8>, ApiError> {
    let input = input.trim();
    let payload = match input.split_once(',') {
        Some((header, data)) => {
            let mime = header
                .strip_prefix("data:")
                .and_then(|rest| rest.split(';').next())
                .unwrap_or("");
            if !mime.is_empty() && !is_image_mime(mime) {
                return Err(ApiError::UploadRejected(format!(
                    "only images are accepted, got {}",
                    mime
                )));
            }
            data
        }
        None => input,
    };

    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if payload.is_empty() {
        return Err(ApiError::Preprocessing("empty image payload".to_string()));
    }

    STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| ApiError::Preprocessing(format!("invalid base64 data: {}", e)))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::UploadRejected("file is too large".to_string())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Pull the image field out of a multipart body, enforcing the MIME filter and size limit
pub async fn read_image_field(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ImageUpload, ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_image_mime(&content_type) {
            warn!("Rejected upload with content type {:?}", content_type);
            return Err(ApiError::UploadRejected(
                "only image files are allowed".to_string(),
            ));
        }
        let file_name = field.file_name().unwrap_or("image").to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > max_bytes {
                warn!("Rejected upload {:?}: larger than {} bytes", file_name, max_bytes);
                return Err(ApiError::UploadRejected(format!(
                    "file exceeds the {} byte limit",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(ImageUpload {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ApiError::BadRequest("no image uploaded".to_string()))
}
