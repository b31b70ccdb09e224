//! Main HTTP gateway server.

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tawjihi_media::{FileHandler, uploads_router};
use tawjihi_memory::{DEFAULT_HISTORY_LIMIT, TawjihiMemory};
use tawjihi_tutors::TutorRegistry;
use tawjihi_understanding::OcrService;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::session_registry::SessionRegistry;
use crate::{api, home, uploads, ws_server};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub tutors: Arc<TutorRegistry>,
    pub memory: TawjihiMemory,
    pub ocr: OcrService,
    pub files: Arc<FileHandler>,
    pub sessions: SessionRegistry,
    /// Messages returned by the history endpoint when no limit is given.
    pub history_limit: usize,
}

impl GatewayState {
    pub fn new(
        tutors: TutorRegistry,
        memory: TawjihiMemory,
        ocr: OcrService,
        files: FileHandler,
    ) -> Self {
        Self {
            tutors: Arc::new(tutors),
            memory,
            ocr,
            files: Arc::new(files),
            sessions: SessionRegistry::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.history_limit = limit;
        }
        self
    }
}

/// Build the full application router.
pub fn build_router(state: GatewayState) -> Router {
    let upload_dir = state.files.upload_dir().to_path_buf();
    // Room for multipart framing and text fields around the largest file.
    let body_limit = (state.files.max_file_size_mb() as usize + 1) * 1024 * 1024;

    Router::new()
        .merge(home::home_router())
        .route("/health", get(api::health))
        .route("/api/agents", get(api::list_agents))
        .route("/api/conversations/:user_id", get(api::list_conversations))
        .route(
            "/api/conversations/:conversation_id/messages",
            get(api::conversation_history),
        )
        .route("/api/subjects/:user_id", get(api::list_subjects))
        .route("/api/study-sessions", post(api::start_study_session))
        .route("/api/study-sessions/:user_id", get(api::list_study_sessions))
        .route("/api/auth/login", post(api::login))
        .route("/api/ask", post(api::ask))
        .route("/api/solve/step-by-step", post(api::solve_step_by_step))
        .route("/api/supported-formats", get(api::supported_formats))
        .route("/api/upload/homework", post(uploads::upload_homework))
        .route("/api/ocr/extract", post(uploads::extract_text))
        .route("/ws/:user_id/:agent_id", get(ws_server::ws_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .nest("/uploads", uploads_router(upload_dir))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState, permissive_cors: bool) -> Result<()> {
    let app = build_router(state);
    let app = if permissive_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    };

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server failed")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
