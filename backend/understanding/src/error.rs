use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("cannot decode image: {0}")]
    Decode(String),

    #[error("image processing failed: {0}")]
    Processing(String),

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tesseract exited with {status}: {stderr}")]
    Tesseract { status: String, stderr: String },

    #[error("OCR engine error: {0}")]
    Engine(String),
}
