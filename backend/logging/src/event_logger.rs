//! Tutoring Event Logger
//!
//! Structured events (question, answer, error, ocr) emitted to the
//! `tutor_events` tracing target, which the file layer persists as NDJSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::{redact_sensitive_data, truncate_for_log};

const MAX_LOGGED_CHARS: usize = 500;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TutorEvent {
    Question {
        subject: String,
        content: String,
    },
    Answer {
        subject: String,
        content: String,
    },
    Ocr {
        language: String,
        confidence: f64,
        word_count: usize,
    },
    Error {
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: TutorEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redact and truncate free text, then emit the event.
    pub fn log_event(session_id: &str, mut event: TutorEvent) {
        match &mut event {
            TutorEvent::Question { content, .. } | TutorEvent::Answer { content, .. } => {
                *content = truncate_for_log(&redact_sensitive_data(content), MAX_LOGGED_CHARS);
            }
            TutorEvent::Error { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            TutorEvent::Ocr { .. } => {}
        }

        let entry = EventLogEntry {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        };

        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: "tutor_events", event = %json, "Tutor event"),
            Err(e) => info!(target: "tutor_events", error = %e, "Unserializable tutor event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let entry = EventLogEntry {
            session_id: "u1_math".into(),
            timestamp: Utc::now(),
            event: TutorEvent::Question {
                subject: "math".into(),
                content: "2+2?".into(),
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "question");
        assert_eq!(json["event"]["subject"], "math");
    }
}
