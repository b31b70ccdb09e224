//! Structured logging for the Tawjihi backend.
//!
//! Console + rolling NDJSON output, secret redaction, and tutoring event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, TutorEvent};
pub use logger::init_logger;
pub use redact::{redact_sensitive_data, truncate_for_log};
