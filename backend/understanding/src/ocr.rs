//! Homework OCR service.
//!
//! Wraps an [`OcrEngine`] with language detection, bilingual extraction and
//! the math-content heuristic. Every entry point returns a result value;
//! failures are logged and reported in the `error` field.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::engine::{OcrEngine, OcrPage};
use crate::error::OcrError;
use crate::preprocess::prepare_for_ocr;

pub const ARABIC: &str = "ara";
pub const ENGLISH: &str = "eng";

const LOW_CONFIDENCE: f64 = 50.0;

const MATH_INDICATORS: &[&str] = &[
    "=", "+", "-", "×", "÷", "²", "³", "√", "sin", "cos", "tan", "log", "ln", "∫", "∑", "π", "α",
    "β", "γ", "θ", "x", "y", "dx", "dy", "لم", "جا", "جتا", "ظا",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrResult {
    pub text: String,
    pub language: String,
    pub confidence: f64,
    pub has_text: bool,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OcrResult {
    fn from_page(page: OcrPage, language: &str) -> Self {
        let text = page.text.trim().to_string();
        Self {
            has_text: !text.is_empty(),
            word_count: text.split_whitespace().count(),
            confidence: round2(page.confidence),
            language: language.to_string(),
            text,
            error: None,
        }
    }

    fn failed(err: &OcrError) -> Self {
        Self {
            text: String::new(),
            language: "unknown".to_string(),
            confidence: 0.0,
            has_text: false,
            word_count: 0,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BilingualResult {
    pub primary: OcrResult,
    pub secondary: OcrResult,
    pub combined_text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Mathematics,
    Language,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HomeworkExtraction {
    #[serde(flatten)]
    pub extraction: BilingualResult,
    pub content_type: ContentType,
    pub is_homework: bool,
    pub extracted_at: DateTime<Utc>,
    pub processing_notes: Vec<String>,
}

impl HomeworkExtraction {
    pub fn is_math(&self) -> bool {
        self.content_type == ContentType::Mathematics
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// True if the lowercased text contains any math indicator.
pub fn is_mathematical_content(text: &str) -> bool {
    let lower = text.to_lowercase();
    MATH_INDICATORS.iter().any(|ind| lower.contains(ind))
}

#[derive(Clone)]
pub struct OcrService {
    engine: Arc<dyn OcrEngine>,
    languages: Vec<String>,
}

impl OcrService {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        info!(engine = %engine.name(), "OCR service ready");
        Self {
            engine,
            languages: vec![ARABIC.to_string(), ENGLISH.to_string()],
        }
    }

    /// Replace the language pair. The first two entries are compared; the
    /// second wins ties and is the fallback. Lists shorter than two are ignored.
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        if languages.len() >= 2 {
            self.languages = languages;
        } else {
            warn!(?languages, "OCR needs two languages; keeping the current pair");
        }
        self
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.languages
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }

    fn first_language(&self) -> &str {
        &self.languages[0]
    }

    fn second_language(&self) -> &str {
        &self.languages[1]
    }

    /// The first configured language if it yields strictly more visible
    /// characters than the second, otherwise the second. Engine failure
    /// defaults to the second.
    pub async fn detect_language(&self, image: &[u8]) -> String {
        match self.detect(image).await {
            Ok((lang, _)) => lang.to_string(),
            Err(e) => {
                warn!(error = %e, fallback = %self.second_language(), "Language detection failed");
                self.second_language().to_string()
            }
        }
    }

    async fn detect(&self, image: &[u8]) -> Result<(&str, OcrPage), OcrError> {
        let (first, second) = (self.first_language(), self.second_language());
        let first_page = self.engine.recognize(image, first).await?;
        let second_page = self.engine.recognize(image, second).await?;
        if visible_chars(&first_page.text) > visible_chars(&second_page.text) {
            Ok((first, first_page))
        } else {
            Ok((second, second_page))
        }
    }

    /// Extract text in `language`, or in the detected language when `None`.
    pub async fn extract_text(&self, image: &[u8], language: Option<&str>) -> OcrResult {
        match self.try_extract(image, language).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "OCR extraction failed");
                OcrResult::failed(&e)
            }
        }
    }

    async fn try_extract(&self, image: &[u8], language: Option<&str>) -> Result<OcrResult, OcrError> {
        let prepared = prepare_for_ocr(image)?;
        let (lang, page) = match language {
            Some(lang) => (lang.to_string(), self.engine.recognize(&prepared, lang).await?),
            None => match self.detect(&prepared).await {
                Ok((lang, page)) => (lang.to_string(), page),
                Err(e) => {
                    let fallback = self.second_language();
                    warn!(error = %e, fallback, "Language detection failed");
                    (fallback.to_string(), self.engine.recognize(&prepared, fallback).await?)
                }
            },
        };
        Ok(OcrResult::from_page(page, &lang))
    }

    /// Extract in both configured languages; the higher-confidence result is
    /// primary. Ties go to the second language (`eng` by default).
    pub async fn extract_text_bilingual(&self, image: &[u8]) -> BilingualResult {
        let first = self.extract_text(image, Some(self.first_language())).await;
        let second = self.extract_text(image, Some(self.second_language())).await;

        let (primary, secondary) = if first.confidence > second.confidence {
            (first, second)
        } else {
            (second, first)
        };
        let combined_text = format!("{}\n{}", primary.text, secondary.text)
            .trim()
            .to_string();

        BilingualResult {
            primary,
            secondary,
            combined_text,
        }
    }

    pub async fn extract_homework_content(&self, image: &[u8]) -> HomeworkExtraction {
        let extraction = self.extract_text_bilingual(image).await;
        let is_math = is_mathematical_content(&extraction.primary.text);

        let mut notes = Vec::new();
        if extraction.primary.confidence < LOW_CONFIDENCE {
            notes.push("Low confidence extraction - image quality may be poor".to_string());
        }
        if !extraction.primary.has_text {
            notes.push("No text detected - image may not contain readable text".to_string());
        }
        if is_math {
            notes.push("Mathematical content detected - may require special formatting".to_string());
        }

        info!(
            language = %extraction.primary.language,
            confidence = extraction.primary.confidence,
            words = extraction.primary.word_count,
            is_math,
            "Homework extracted"
        );

        HomeworkExtraction {
            extraction,
            content_type: if is_math {
                ContentType::Mathematics
            } else {
                ContentType::Language
            },
            is_homework: true,
            extracted_at: Utc::now(),
            processing_notes: notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockOcrEngine;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn sample_png() -> Vec<u8> {
        let img = GrayImage::from_fn(16, 16, |x, _| Luma([if x % 4 == 0 { 0 } else { 255 }]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn service(engine: MockOcrEngine) -> OcrService {
        OcrService::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn test_bilingual_picks_higher_confidence() {
        let svc = service(
            MockOcrEngine::new()
                .with_page(ARABIC, "حل المعادلة", 88.456)
                .with_page(ENGLISH, "Jl", 41.0),
        );
        let result = svc.extract_text_bilingual(&sample_png()).await;
        assert_eq!(result.primary.language, ARABIC);
        assert_eq!(result.primary.confidence, 88.46);
        assert_eq!(result.secondary.language, ENGLISH);
        assert_eq!(result.combined_text, "حل المعادلة\nJl");
    }

    #[tokio::test]
    async fn test_bilingual_tie_goes_to_english() {
        let svc = service(
            MockOcrEngine::new()
                .with_page(ARABIC, "نص", 70.0)
                .with_page(ENGLISH, "text", 70.0),
        );
        let result = svc.extract_text_bilingual(&sample_png()).await;
        assert_eq!(result.primary.language, ENGLISH);
    }

    #[tokio::test]
    async fn test_detects_language_by_visible_chars() {
        let svc = service(
            MockOcrEngine::new()
                .with_page(ARABIC, "ما هو الفاعل في الجملة", 60.0)
                .with_page(ENGLISH, "l l", 90.0),
        );
        let result = svc.extract_text(&sample_png(), None).await;
        assert_eq!(result.language, ARABIC);
        assert_eq!(result.word_count, 5);
        assert!(result.has_text);
    }

    #[tokio::test]
    async fn test_equal_chars_detects_english() {
        let svc = service(
            MockOcrEngine::new()
                .with_page(ARABIC, "abcd", 60.0)
                .with_page(ENGLISH, "wxyz", 60.0),
        );
        assert_eq!(svc.detect_language(&sample_png()).await, ENGLISH);
    }

    #[tokio::test]
    async fn test_failures_yield_empty_result() {
        let svc = service(MockOcrEngine::new().failing("tesseract missing"));
        let result = svc.extract_text(&sample_png(), Some(ENGLISH)).await;
        assert_eq!(result.language, "unknown");
        assert!(!result.has_text);
        assert!(result.error.unwrap().contains("tesseract missing"));

        let result = svc.extract_text(b"garbage", Some(ENGLISH)).await;
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_configured_languages_drive_extraction() {
        let svc = service(MockOcrEngine::new().with_page("fra", "Résous l'équation", 83.0))
            .with_languages(vec!["fra".into(), "eng".into()]);
        assert_eq!(svc.supported_languages(), ["fra", "eng"]);
        assert!(svc.supports_language("fra"));
        assert!(!svc.supports_language("ara"));

        let result = svc.extract_text_bilingual(&sample_png()).await;
        assert_eq!(result.primary.language, "fra");
        assert_eq!(result.secondary.language, "eng");
        assert_eq!(svc.detect_language(&sample_png()).await, "fra");
    }

    #[tokio::test]
    async fn test_single_language_list_is_ignored() {
        let svc = service(MockOcrEngine::new()).with_languages(vec!["eng".into()]);
        assert_eq!(svc.supported_languages(), [ARABIC, ENGLISH]);
    }

    #[tokio::test]
    async fn test_detection_failure_falls_back_to_second_language() {
        let svc = service(MockOcrEngine::new().failing("boom"))
            .with_languages(vec!["ara".into(), "fra".into()]);
        assert_eq!(svc.detect_language(&sample_png()).await, "fra");
    }

    #[test]
    fn test_math_detection() {
        assert!(is_mathematical_content("Solve 2X + 3 = 7"));
        assert!(is_mathematical_content("احسب جتا 60"));
        assert!(is_mathematical_content("∫ f(t) dt"));
        assert!(!is_mathematical_content("اقرأ القصيدة"));
        assert!(!is_mathematical_content("Read the poem"));
    }

    #[tokio::test]
    async fn test_homework_notes() {
        let svc = service(MockOcrEngine::new().with_page(ENGLISH, "x + 2 = 5", 42.0));
        let hw = svc.extract_homework_content(&sample_png()).await;
        assert!(hw.is_math());
        assert!(hw.is_homework);
        assert_eq!(
            hw.processing_notes,
            vec![
                "Low confidence extraction - image quality may be poor".to_string(),
                "Mathematical content detected - may require special formatting".to_string(),
            ]
        );

        let empty = service(MockOcrEngine::new())
            .extract_homework_content(&sample_png())
            .await;
        assert_eq!(empty.content_type, ContentType::Language);
        assert!(empty
            .processing_notes
            .iter()
            .any(|n| n.starts_with("No text detected")));
    }

    #[test]
    fn test_homework_serializes_flat() {
        let hw = HomeworkExtraction {
            extraction: BilingualResult {
                primary: OcrResult::from_page(OcrPage::default(), ENGLISH),
                secondary: OcrResult::from_page(OcrPage::default(), ARABIC),
                combined_text: String::new(),
            },
            content_type: ContentType::Language,
            is_homework: true,
            extracted_at: Utc::now(),
            processing_notes: vec![],
        };
        let json = serde_json::to_value(&hw).unwrap();
        assert_eq!(json["content_type"], "language");
        assert_eq!(json["primary"]["language"], "eng");
        assert!(json["primary"].get("error").is_none());
    }
}
