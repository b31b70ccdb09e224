//! Homework upload storage.
//!
//! Files are validated (size, MIME type, decodable image) and written to
//! `<upload_dir>/<user_id>/<uuid><ext>`, which the uploads router serves back.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::ColorType;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::mime_detect::{detect_mime_type, extension_for};

pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

pub const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
];
pub const DOCUMENT_TYPES: &[&str] = &["application/pdf", "text/plain"];

#[derive(Debug, Error)]
pub enum FileError {
    #[error("invalid file: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("unsafe path segment: {0}")]
    UnsafePath(String),

    #[error("failed to save file: {0}")]
    Io(#[from] std::io::Error),
}

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileInfo {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub file_info: FileInfo,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavedFile {
    pub file_path: String,
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub content_type: String,
    pub url: String,
}

/// Metadata of a file already on disk.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct StoredFileInfo {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub is_image: bool,
    pub is_document: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SupportedTypes {
    pub images: Vec<String>,
    pub documents: Vec<String>,
    pub all: Vec<String>,
}

/// Rejects empty, dot-only and separator-containing path segments.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.contains("..")
        && !segment.contains(['/', '\\', '\0'])
        && segment != "."
}

/// PIL-style mode name for a decoded image.
fn mode_name(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".into(),
        ColorType::La8 => "LA".into(),
        ColorType::Rgb8 => "RGB".into(),
        ColorType::Rgba8 => "RGBA".into(),
        ColorType::L16 => "I;16".into(),
        other => format!("{other:?}"),
    }
}

#[derive(Debug, Clone)]
pub struct FileHandler {
    upload_dir: PathBuf,
    max_file_size: u64,
}

impl FileHandler {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
        }
    }

    pub fn with_max_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size = mb * 1024 * 1024;
        self
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / (1024 * 1024)
    }

    pub fn validate(&self, file: &UploadedFile) -> ValidationResult {
        let mut result = ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            file_info: FileInfo {
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
                size: file.data.len(),
                image_size: None,
                image_mode: None,
            },
        };

        if file.filename.as_deref().is_none_or(str::is_empty) {
            result.is_valid = false;
            result.errors.push("No file provided".to_string());
            return result;
        }

        if file.data.len() as u64 > self.max_file_size {
            result.is_valid = false;
            result.errors.push(format!(
                "File too large. Maximum size: {}MB",
                self.max_file_size_mb()
            ));
        }

        let content_type = file.content_type.as_deref().unwrap_or_default();
        if !IMAGE_TYPES.contains(&content_type) && !DOCUMENT_TYPES.contains(&content_type) {
            result.is_valid = false;
            result
                .errors
                .push(format!("Unsupported file type: {content_type}"));
        }

        if IMAGE_TYPES.contains(&content_type) {
            match image::load_from_memory(&file.data) {
                Ok(img) => {
                    result.file_info.image_size = Some([img.width(), img.height()]);
                    result.file_info.image_mode = Some(mode_name(img.color()));
                }
                Err(e) => {
                    result.is_valid = false;
                    result.errors.push(format!("Invalid image file: {e}"));
                }
            }
        }

        result
    }

    /// Validate and write the file under the user's directory.
    pub async fn save(&self, file: &UploadedFile, user_id: &str) -> Result<SavedFile, FileError> {
        let validation = self.validate(file);
        if !validation.is_valid {
            return Err(FileError::Invalid(validation.errors));
        }
        if !is_safe_segment(user_id) {
            return Err(FileError::UnsafePath(user_id.to_string()));
        }

        let original_name = file.filename.clone().unwrap_or_default();
        let content_type = file.content_type.clone().unwrap_or_default();
        let extension = Path::new(&original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .or_else(|| extension_for(&content_type).map(str::to_string))
            .unwrap_or_default();
        let filename = format!("{}{extension}", Uuid::new_v4());

        let user_dir = self.upload_dir.join(user_id);
        fs::create_dir_all(&user_dir).await?;
        let path = user_dir.join(&filename);
        if let Err(e) = fs::write(&path, &file.data).await {
            error!(path = %path.display(), error = %e, "File save failed");
            return Err(e.into());
        }

        info!(path = %path.display(), size = file.data.len(), "File saved");

        Ok(SavedFile {
            file_path: path.display().to_string(),
            url: format!("/uploads/{user_id}/{filename}"),
            filename,
            original_name,
            size: file.data.len(),
            content_type,
        })
    }

    pub async fn get_file_info(&self, path: &Path) -> StoredFileInfo {
        match fs::metadata(path).await {
            Ok(meta) => {
                let mime = detect_mime_type(path);
                let known = mime != "application/octet-stream";
                StoredFileInfo {
                    exists: true,
                    size: Some(meta.len()),
                    modified: meta.modified().ok().map(DateTime::<Utc>::from),
                    mime_type: known.then(|| mime.to_string()),
                    is_image: IMAGE_TYPES.contains(&mime),
                    is_document: DOCUMENT_TYPES.contains(&mime),
                    error: None,
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredFileInfo::default(),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error getting file info");
                StoredFileInfo {
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        }
    }

    /// True if a file was removed.
    pub async fn delete_file(&self, path: &Path) -> bool {
        match fs::remove_file(path).await {
            Ok(()) => {
                info!(path = %path.display(), "File deleted");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error deleting file");
                false
            }
        }
    }

    /// Delete the user's files last modified more than `older_than_days` ago.
    pub async fn cleanup_user_files(&self, user_id: &str, older_than_days: u64) -> usize {
        if !is_safe_segment(user_id) {
            warn!(user_id, "Refusing cleanup for unsafe user id");
            return 0;
        }
        let user_dir = self.upload_dir.join(user_id);
        let mut entries = match fs::read_dir(&user_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                error!(error = %e, "Error during cleanup");
                return 0;
            }
        };

        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(older_than_days * 24 * 60 * 60))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut deleted = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Error during cleanup");
                    break;
                }
            };
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let expired = meta.is_file() && meta.modified().is_ok_and(|m| m < cutoff);
            if expired && self.delete_file(&entry.path()).await {
                deleted += 1;
            }
        }

        info!(user_id, deleted, "Cleaned up old files");
        deleted
    }

    pub fn get_supported_types(&self) -> SupportedTypes {
        let images: Vec<String> = IMAGE_TYPES.iter().map(|s| s.to_string()).collect();
        let documents: Vec<String> = DOCUMENT_TYPES.iter().map(|s| s.to_string()).collect();
        let all = images.iter().chain(documents.iter()).cloned().collect();
        SupportedTypes {
            images,
            documents,
            all,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Bytes {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(4, 3))
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        Bytes::from(cursor.into_inner())
    }

    fn upload(name: &str, mime: &str, data: Bytes) -> UploadedFile {
        UploadedFile {
            filename: Some(name.to_string()),
            content_type: Some(mime.to_string()),
            data,
        }
    }

    #[test]
    fn test_validate_image_reports_size_and_mode() {
        let handler = FileHandler::new("unused");
        let result = handler.validate(&upload("hw.png", "image/png", png_bytes()));
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.file_info.image_size, Some([4, 3]));
        assert_eq!(result.file_info.image_mode.as_deref(), Some("RGB"));
    }

    #[test]
    fn test_validate_collects_errors() {
        let handler = FileHandler::new("unused").with_max_size_mb(1);
        let big = Bytes::from(vec![0u8; 1024 * 1024 + 1]);
        let result = handler.validate(&upload("movie.mp4", "video/mp4", big));
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec![
                "File too large. Maximum size: 1MB".to_string(),
                "Unsupported file type: video/mp4".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_corrupt_image_and_missing_name() {
        let handler = FileHandler::new("unused");
        let result = handler.validate(&upload("hw.jpg", "image/jpeg", Bytes::from_static(b"nope")));
        assert!(result.errors[0].starts_with("Invalid image file"));

        let mut nameless = upload("", "image/png", png_bytes());
        nameless.filename = None;
        assert_eq!(handler.validate(&nameless).errors, vec!["No file provided"]);
    }

    #[tokio::test]
    async fn test_save_writes_under_user_dir() {
        let dir = tempfile::tempdir().unwrap();
        let handler = FileHandler::new(dir.path());

        let saved = handler
            .save(&upload("Page1.PNG", "image/png", png_bytes()), "student-1")
            .await
            .unwrap();
        assert!(saved.filename.ends_with(".png"));
        assert_eq!(saved.original_name, "Page1.PNG");
        assert_eq!(saved.url, format!("/uploads/student-1/{}", saved.filename));

        let info = handler.get_file_info(Path::new(&saved.file_path)).await;
        assert!(info.exists);
        assert!(info.is_image);
        assert_eq!(info.size, Some(saved.size as u64));

        assert!(handler.delete_file(Path::new(&saved.file_path)).await);
        assert!(!handler.delete_file(Path::new(&saved.file_path)).await);
        assert!(!handler.get_file_info(Path::new(&saved.file_path)).await.exists);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_and_unsafe() {
        let dir = tempfile::tempdir().unwrap();
        let handler = FileHandler::new(dir.path());
        let err = handler
            .save(&upload("a.exe", "application/x-msdownload", Bytes::from_static(b"MZ")), "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::Invalid(_)));

        let err = handler
            .save(&upload("a.txt", "text/plain", Bytes::from_static(b"hi")), "../etc")
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::UnsafePath(_)));
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let handler = FileHandler::new(dir.path());
        let user_dir = dir.path().join("u1");
        std::fs::create_dir_all(&user_dir).unwrap();

        let old = user_dir.join("old.txt");
        std::fs::write(&old, "old").unwrap();
        let forty_days = Duration::from_secs(40 * 24 * 60 * 60);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(SystemTime::now() - forty_days)
            .unwrap();
        std::fs::write(user_dir.join("new.txt"), "new").unwrap();

        assert_eq!(handler.cleanup_user_files("u1", 30).await, 1);
        assert!(!old.exists());
        assert!(user_dir.join("new.txt").exists());
        assert_eq!(handler.cleanup_user_files("nobody", 30).await, 0);
    }

    #[test]
    fn test_supported_types() {
        let types = FileHandler::new("unused").get_supported_types();
        assert_eq!(types.images.len(), 6);
        assert_eq!(types.all.len(), 8);
        assert!(types.documents.contains(&"application/pdf".to_string()));
    }
}
