//! Upload validation and local storage.
//!
//! Each kind has a MIME prefix and a byte ceiling; violations are rejected
//! before anything is written or forwarded.

use std::path::PathBuf;

use chrono::Utc;
use configs::UploadsConfig;
use rand::{distributions::Alphanumeric, Rng};
use tokio::fs;
use tracing::{error, info, warn};

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Thumbnail,
    Banner,
    Profile,
    Gallery,
    Brochure,
}

impl UploadKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "thumbnail" | "thumbnails" => Some(UploadKind::Thumbnail),
            "banner" | "banners" => Some(UploadKind::Banner),
            "profile" | "profiles" => Some(UploadKind::Profile),
            "gallery" => Some(UploadKind::Gallery),
            "brochure" | "brochures" => Some(UploadKind::Brochure),
            _ => None,
        }
    }

    /// Sub-directory under the uploads root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            UploadKind::Thumbnail => "thumbnails",
            UploadKind::Banner => "banners",
            UploadKind::Profile => "profiles",
            UploadKind::Gallery => "gallery",
            UploadKind::Brochure => "brochures",
        }
    }

    /// Multipart field names accepted for this kind.
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Thumbnail => &["thumbnail", "file"],
            UploadKind::Banner => &["banner", "file"],
            UploadKind::Profile => &["profile", "file"],
            UploadKind::Gallery => &["file", "image"],
            UploadKind::Brochure => &["file", "brochure"],
        }
    }

    pub fn mime_prefix(&self) -> &'static str {
        match self {
            UploadKind::Brochure => "application/pdf",
            _ => "image/",
        }
    }

    pub fn max_bytes(&self, cfg: &UploadsConfig) -> u64 {
        match self {
            UploadKind::Thumbnail => cfg.thumbnail_max_bytes,
            UploadKind::Banner => cfg.banner_max_bytes,
            UploadKind::Profile => cfg.profile_max_bytes,
            UploadKind::Gallery => cfg.gallery_max_bytes,
            UploadKind::Brochure => cfg.brochure_max_bytes,
        }
    }
}

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Reject wrong MIME types and oversize files, regardless of content.
pub fn validate(kind: UploadKind, file: &UploadedFile, cfg: &UploadsConfig) -> Result<(), ServiceError> {
    if !file.content_type.to_ascii_lowercase().starts_with(kind.mime_prefix()) {
        return Err(ServiceError::Validation(format!(
            "invalid file type '{}'; expected {}",
            file.content_type,
            kind.mime_prefix()
        )));
    }
    let limit = kind.max_bytes(cfg);
    if file.bytes.len() as u64 > limit {
        return Err(ServiceError::Validation(format!(
            "file too large: {} bytes exceeds {} MB limit",
            file.bytes.len(),
            limit / (1024 * 1024)
        )));
    }
    if file.bytes.is_empty() {
        return Err(ServiceError::Validation("file is empty".into()));
    }
    Ok(())
}

/// Keep ASCII letters, digits, dots, dashes and underscores; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "upload".to_string() } else { cleaned }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub url: String,
    pub file_name: String,
}

/// Writes uploads under `<root>/<kind>/` and builds their public URLs.
#[derive(Debug, Clone)]
pub struct LocalUploads {
    root: PathBuf,
    public_url: Option<String>,
}

impl LocalUploads {
    pub fn new<P: Into<PathBuf>>(root: P, public_url: Option<String>) -> Self {
        Self { root: root.into(), public_url }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Absolute when a public origin is configured, otherwise site-relative.
    pub fn public_url_for(&self, relative: &str) -> String {
        match &self.public_url {
            Some(origin) => format!("{}/{}", origin.trim_end_matches('/'), relative.trim_start_matches('/')),
            None => format!("/{}", relative.trim_start_matches('/')),
        }
    }

    pub async fn save(&self, kind: UploadKind, file: &UploadedFile) -> Result<StoredUpload, ServiceError> {
        let dir = self.root.join(kind.dir_name());
        fs::create_dir_all(&dir).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        let file_name = format!("{}-{}-{}", Utc::now().timestamp_millis(), suffix, sanitize_file_name(&file.file_name));
        let path = dir.join(&file_name);
        fs::write(&path, &file.bytes).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "upload write failed");
            ServiceError::Storage(e.to_string())
        })?;
        let url = self.public_url_for(&format!("uploads/{}/{}", kind.dir_name(), file_name));
        info!(kind = kind.dir_name(), bytes = file.bytes.len(), %url, "upload stored locally");
        Ok(StoredUpload { path, url, file_name })
    }

    /// Undo a [`save`](Self::save) whose record could not be registered.
    pub async fn discard(&self, stored: &StoredUpload) {
        match fs::remove_file(&stored.path).await {
            Ok(()) => info!(path = %stored.path.display(), "orphaned upload removed"),
            Err(e) => warn!(path = %stored.path.display(), error = %e, "failed to remove orphaned upload"),
        }
    }
}
