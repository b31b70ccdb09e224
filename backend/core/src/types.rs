use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A tutoring subject. Exactly one tutor persona is bound to each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    Arabic,
    English,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Math, Subject::Arabic, Subject::English];

    /// Stable identifier used in URLs, WebSocket paths and `teacher_id` columns.
    pub fn id(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Arabic => "arabic",
            Subject::English => "english",
        }
    }

    /// Comma-separated list of subject ids, as shown to students.
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|s| s.id())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Error)]
#[error("unknown subject: {0}")]
pub struct UnknownSubject(pub String);

impl FromStr for Subject {
    type Err = UnknownSubject;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "arabic" => Ok(Subject::Arabic),
            "english" => Ok(Subject::English),
            _ => Err(UnknownSubject(s.to_string())),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Public description of a tutor, as listed by `GET /api/agents`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_parse_is_case_insensitive() {
        assert_eq!("Math".parse::<Subject>().unwrap(), Subject::Math);
        assert_eq!(" ARABIC ".parse::<Subject>().unwrap(), Subject::Arabic);
        assert_eq!("english".parse::<Subject>().unwrap(), Subject::English);
    }

    #[test]
    fn test_subject_parse_rejects_unknown() {
        let err = "physics".parse::<Subject>().unwrap_err();
        assert_eq!(err.0, "physics");
    }

    #[test]
    fn test_available_lists_all_subjects() {
        assert_eq!(Subject::available(), "math, arabic, english");
    }

    #[test]
    fn test_subject_serialization() {
        let json = serde_json::to_string(&Subject::Arabic).unwrap();
        assert_eq!(json, "\"arabic\"");
        let role = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(role, "\"assistant\"");
    }
}
