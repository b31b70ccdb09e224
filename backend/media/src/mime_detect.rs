//! MIME type detection for uploaded files.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "bmp"          => "image/bmp",
        "pdf"          => "application/pdf",
        "txt"          => "text/plain",
        _              => "application/octet-stream",
    }
}

/// File extension (with dot) for a supported MIME type.
pub fn extension_for(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/png"                => Some(".png"),
        "image/gif"                => Some(".gif"),
        "image/webp"               => Some(".webp"),
        "image/bmp"                => Some(".bmp"),
        "application/pdf"          => Some(".pdf"),
        "text/plain"               => Some(".txt"),
        _                          => None,
    }
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Whether a file is safe to serve inline (not just download).
pub fn is_inline_safe(mime: &str) -> bool {
    matches!(
        mime,
        "image/jpeg" | "image/png" | "image/gif" | "image/webp" | "image/bmp"
        | "text/plain" | "application/pdf"
    )
}
