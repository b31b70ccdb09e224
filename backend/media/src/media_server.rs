//! Serves saved uploads back over HTTP.
//!
//! Mount at `/uploads`:
//!   GET /uploads/:user_id/:filename

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::{path::PathBuf, sync::Arc};
use tokio::fs;
use tracing::{debug, warn};

use crate::file_handler::is_safe_segment;
use crate::mime_detect::{detect_mime_type, is_inline_safe};

#[derive(Clone)]
pub struct UploadsState {
    pub upload_dir: Arc<PathBuf>,
}

/// Build the uploads router, meant to be nested under `/uploads`.
pub fn uploads_router(upload_dir: PathBuf) -> Router {
    let state = UploadsState {
        upload_dir: Arc::new(upload_dir),
    };
    Router::new()
        .route("/:user_id/:filename", get(serve_upload))
        .with_state(state)
}

async fn serve_upload(
    Path((user_id, filename)): Path<(String, String)>,
    State(state): State<UploadsState>,
) -> Response {
    if !is_safe_segment(&user_id) || !is_safe_segment(&filename) {
        warn!(user_id = %user_id, filename = %filename, "Rejected suspicious upload path");
        return (StatusCode::BAD_REQUEST, "Invalid path").into_response();
    }

    let path = state.upload_dir.join(&user_id).join(&filename);
    debug!(path = %path.display(), "Serving upload");

    match fs::read(&path).await {
        Ok(bytes) => {
            let mime = detect_mime_type(&path);
            let disposition = if is_inline_safe(mime) {
                format!("inline; filename=\"{filename}\"")
            } else {
                format!("attachment; filename=\"{filename}\"")
            };
            let disposition = HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(mime)),
                    (header::CONTENT_DISPOSITION, disposition),
                    (
                        header::CACHE_CONTROL,
                        HeaderValue::from_static("private, max-age=3600"),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read upload");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(dir: &std::path::Path) -> Router {
        Router::new().nest("/uploads", uploads_router(dir.to_path_buf()))
    }

    #[tokio::test]
    async fn serves_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("u1")).unwrap();
        std::fs::write(dir.path().join("u1/notes.txt"), "x = 2").unwrap();

        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/uploads/u1/notes.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"x = 2");
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/uploads/u1/missing.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/uploads/u1/..%2Fsecret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
