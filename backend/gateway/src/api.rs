//! JSON API handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tawjihi_core::{AgentInfo, MessageRole};
use tawjihi_logging::{EventLogger, TutorEvent};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::GatewayState;

pub const SERVICE_NAME: &str = "TawjihiAI API";
pub const SERVICE_VERSION: &str = "2.0.0";

const MISSING_INPUT: &str = "يرجى إدخال المادة والسؤال";
const LOGIN_OK: &str = "تم تسجيل الدخول بنجاح";

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub question: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub problem: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    #[allow(dead_code)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MessageResponse {
    pub response: String,
    pub conversation_id: Option<String>,
}

/// How the tutor is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorMode {
    Ask,
    StepByStep,
}

/// Caller's user id, or a fresh v4 UUID.
pub(crate) fn user_or_new(user_id: Option<String>) -> String {
    user_id
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Ask the subject's tutor and record both turns in the user's conversation
/// with that tutor. Memory failures only drop the record.
pub(crate) async fn tutor_exchange(
    state: &GatewayState,
    user_id: &str,
    subject: &str,
    question: &str,
    mode: TutorMode,
) -> MessageResponse {
    let teacher_id = subject.trim().to_lowercase();
    let conversation_id = state
        .memory
        .get_or_create_conversation(user_id, &teacher_id, None)
        .await;
    let session = conversation_id.as_deref().unwrap_or(user_id);

    if let Some(id) = &conversation_id {
        state.memory.save_message(id, question, MessageRole::User).await;
    }
    EventLogger::log_event(
        session,
        TutorEvent::Question {
            subject: teacher_id.clone(),
            content: question.to_string(),
        },
    );

    let response = match mode {
        TutorMode::Ask => state.tutors.ask(subject, question).await,
        TutorMode::StepByStep => state.tutors.solve_step_by_step(subject, question).await,
    };

    if let Some(id) = &conversation_id {
        state
            .memory
            .save_message(id, &response, MessageRole::Assistant)
            .await;
    }
    EventLogger::log_event(
        session,
        TutorEvent::Answer {
            subject: teacher_id,
            content: response.clone(),
        },
    );

    MessageResponse {
        response,
        conversation_id,
    }
}

pub async fn health(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "active_sessions": state.sessions.connected_count().await,
    }))
}

pub async fn list_agents(State(state): State<GatewayState>) -> Json<Vec<AgentInfo>> {
    Json(state.tutors.agents())
}

pub async fn list_conversations(
    Path(user_id): Path<String>,
    State(state): State<GatewayState>,
) -> Result<Json<Value>, ApiError> {
    let conversations = state.memory.try_list_conversations(&user_id).await?;
    debug!(user_id = %user_id, count = conversations.len(), "Listed conversations");
    Ok(Json(json!({ "conversations": conversations })))
}

#[derive(Debug, Deserialize)]
pub struct StudySessionRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub subject: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Messages of one conversation, oldest first.
pub async fn conversation_history(
    Path(conversation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<GatewayState>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(state.history_limit);
    let messages = state
        .memory
        .get_conversation_history(&conversation_id, limit)
        .await;
    Json(json!({ "conversation_id": conversation_id, "messages": messages }))
}

pub async fn list_subjects(
    Path(user_id): Path<String>,
    State(state): State<GatewayState>,
) -> Json<Value> {
    let subjects = state.memory.get_user_subjects(&user_id).await;
    Json(json!({ "subjects": subjects }))
}

pub async fn list_study_sessions(
    Path(user_id): Path<String>,
    State(state): State<GatewayState>,
) -> Json<Value> {
    let sessions = state.memory.get_user_study_sessions(&user_id).await;
    Json(json!({ "study_sessions": sessions }))
}

/// Open a study session; the subject row is created on first use.
pub async fn start_study_session(
    State(state): State<GatewayState>,
    Json(req): Json<StudySessionRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.user_id.trim().is_empty() || req.subject.trim().is_empty() {
        return Err(ApiError::BadRequest(MISSING_INPUT.to_string()));
    }
    let subject = req.subject.trim().to_lowercase();
    let session_id = state
        .memory
        .create_study_session(req.user_id.trim(), &subject)
        .await
        .ok_or_else(|| ApiError::Internal("Could not create study session".to_string()))?;
    Ok(Json(json!({ "session_id": session_id, "subject": subject })))
}

/// Stub login: any username is accepted and gets a fresh session id.
pub async fn login(Json(req): Json<LoginRequest>) -> Json<Value> {
    info!(username = %req.username, "Login");
    Json(json!({
        "message": LOGIN_OK,
        "session_id": Uuid::new_v4().to_string(),
        "user_id": req.username,
    }))
}

pub async fn ask(
    State(state): State<GatewayState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.subject.trim().is_empty() || req.question.trim().is_empty() {
        return Err(ApiError::BadRequest(MISSING_INPUT.to_string()));
    }
    let user_id = user_or_new(req.user_id);
    let reply = tutor_exchange(&state, &user_id, &req.subject, &req.question, TutorMode::Ask).await;
    Ok(Json(reply))
}

pub async fn solve_step_by_step(
    State(state): State<GatewayState>,
    Json(req): Json<SolveRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.subject.trim().is_empty() || req.problem.trim().is_empty() {
        return Err(ApiError::BadRequest(MISSING_INPUT.to_string()));
    }
    let user_id = user_or_new(req.user_id);
    let reply = tutor_exchange(
        &state,
        &user_id,
        &req.subject,
        &req.problem,
        TutorMode::StepByStep,
    )
    .await;
    Ok(Json(reply))
}

pub async fn supported_formats(State(state): State<GatewayState>) -> Json<Value> {
    let types = state.files.get_supported_types();
    Json(json!({
        "images": types.images,
        "documents": types.documents,
        "all": types.all,
        "max_file_size_mb": state.files.max_file_size_mb(),
        "ocr_languages": state.ocr.supported_languages(),
    }))
}
