//! Multipart upload handlers: homework photos and raw OCR.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use serde_json::{Value, json};
use tawjihi_logging::{EventLogger, TutorEvent};
use tawjihi_media::{SavedFile, UploadedFile, is_image};
use tawjihi_understanding::HomeworkExtraction;
use tracing::{debug, info};

use crate::api::{TutorMode, tutor_exchange, user_or_new};
use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    user_id: Option<String>,
    subject: Option<String>,
    question: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HomeworkResponse {
    pub file: SavedFile,
    /// Absent for non-image uploads.
    pub extraction: Option<HomeworkExtraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?;
            debug!(filename = ?filename, content_type = ?content_type, size = data.len(), "Received upload");
            form.file = Some(UploadedFile {
                filename,
                content_type,
                data,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read field '{name}': {e}")))?;
        match name.as_str() {
            "user_id" => form.user_id = non_blank(value),
            "subject" => form.subject = non_blank(value),
            "question" => form.question = non_blank(value),
            "language" => form.language = non_blank(value),
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

fn require_file(form: &mut UploadForm) -> Result<UploadedFile, ApiError> {
    form.file
        .take()
        .ok_or_else(|| ApiError::InvalidFile(vec!["No file provided".to_string()]))
}

/// Save a homework photo, read it, and ask a tutor about it.
///
/// The tutor defaults to `math` for mathematical content and `arabic`
/// otherwise. A `question` field is sent ahead of the extracted text.
pub async fn upload_homework(
    State(state): State<GatewayState>,
    multipart: Multipart,
) -> Result<Json<HomeworkResponse>, ApiError> {
    let mut form = read_form(multipart).await?;
    let file = require_file(&mut form)?;
    let user_id = user_or_new(form.user_id.take());

    let saved = state.files.save(&file, &user_id).await?;

    if !is_image(&saved.content_type) {
        info!(file = %saved.filename, "Stored document upload without OCR");
        return Ok(Json(HomeworkResponse {
            file: saved,
            extraction: None,
            response: None,
            conversation_id: None,
        }));
    }

    let extraction = state.ocr.extract_homework_content(&file.data).await;
    let primary = &extraction.extraction.primary;
    EventLogger::log_event(
        &user_id,
        TutorEvent::Ocr {
            language: primary.language.clone(),
            confidence: primary.confidence,
            word_count: primary.word_count,
        },
    );

    let text = extraction.extraction.combined_text.clone();
    if text.is_empty() {
        return Ok(Json(HomeworkResponse {
            file: saved,
            extraction: Some(extraction),
            response: None,
            conversation_id: None,
        }));
    }

    let subject = form.subject.take().unwrap_or_else(|| {
        if extraction.is_math() { "math" } else { "arabic" }.to_string()
    });
    let prompt = match form.question.take() {
        Some(question) => format!("{question}\n\n{text}"),
        None => text,
    };

    let reply = tutor_exchange(&state, &user_id, &subject, &prompt, TutorMode::Ask).await;

    Ok(Json(HomeworkResponse {
        file: saved,
        extraction: Some(extraction),
        response: Some(reply.response),
        conversation_id: reply.conversation_id,
    }))
}

/// OCR an image without storing it. `language` is one of the configured OCR
/// languages or `auto` (the default, which runs both and ranks by confidence).
pub async fn extract_text(
    State(state): State<GatewayState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = read_form(multipart).await?;
    let file = require_file(&mut form)?;

    let validation = state.files.validate(&file);
    if !validation.is_valid {
        return Err(ApiError::InvalidFile(validation.errors));
    }
    let content_type = file.content_type.as_deref().unwrap_or_default();
    if !is_image(content_type) {
        return Err(ApiError::BadRequest(format!(
            "OCR requires an image, got {content_type}"
        )));
    }

    let language = form.language.as_deref().unwrap_or("auto");
    let body = match language {
        "auto" => {
            let result = state.ocr.extract_text_bilingual(&file.data).await;
            to_json(&result)?
        }
        lang if state.ocr.supports_language(lang) => {
            let result = state.ocr.extract_text(&file.data, Some(lang)).await;
            to_json(&result)?
        }
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unsupported language: {other} (use {} or auto)",
                state.ocr.supported_languages().join(", ")
            )));
        }
    };

    Ok(Json(json!({ "language": language, "result": body })))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}
