pub mod file_handler;
pub mod media_server;
pub mod mime_detect;

pub use file_handler::{
    FileError, FileHandler, FileInfo, SavedFile, StoredFileInfo, SupportedTypes, UploadedFile,
    ValidationResult,
};
pub use media_server::uploads_router;
pub use mime_detect::{detect_mime_type, extension_for, is_image, is_inline_safe};
