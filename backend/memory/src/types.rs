use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A row of `conversations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub teacher_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewConversation {
    pub user_id: String,
    pub teacher_id: String,
    pub title: String,
}

/// A row of `messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub content: String,
    pub role: String,
    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub content: String,
    pub role: String,
}

/// A row of `subjects`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_text")]
    pub grade_level: Option<String>,
    #[serde(default, deserialize_with = "flexible_text")]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub study_hours_target: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSubject {
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A row of `study_sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudySession {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub topics_covered: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub session_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewStudySession {
    pub user_id: String,
    pub subject_id: String,
    pub duration_minutes: i64,
    pub topics_covered: Vec<String>,
    pub session_date: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

/// Level columns are text in some deployments and integers in others.
fn flexible_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(|v| match v {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Int(n) => n.to_string(),
        TextOrNumber::Float(f) => f.to_string(),
    }))
}

/// Accept both `timestamptz` (RFC 3339) and bare `timestamp` columns.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_accepts_offset_timestamp() {
        let raw = r#"{"id":"c1","user_id":"u1","teacher_id":"math","title":null,
                      "updated_at":"2025-03-01T10:00:00.123456+00:00"}"#;
        let conv: Conversation = serde_json::from_str(raw).unwrap();
        assert_eq!(conv.updated_at.unwrap().timestamp(), 1_740_823_200);
    }

    #[test]
    fn test_message_accepts_naive_timestamp() {
        let raw = r#"{"content":"hi","role":"user","created_at":"2025-03-01T10:00:00"}"#;
        let msg: StoredMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.created_at.is_some());
        assert!(msg.id.is_none());
    }

    #[test]
    fn test_subject_levels_accept_numbers_and_text() {
        let raw = r#"{"id":"s1","user_id":"u1","name":"math",
                      "grade_level":12,"difficulty_level":"advanced","study_hours_target":5}"#;
        let subject: SubjectRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(subject.grade_level.as_deref(), Some("12"));
        assert_eq!(subject.difficulty_level.as_deref(), Some("advanced"));

        let raw = r#"{"id":"s2","user_id":"u1","name":"arabic","grade_level":null}"#;
        let subject: SubjectRecord = serde_json::from_str(raw).unwrap();
        assert!(subject.grade_level.is_none());
        assert!(subject.difficulty_level.is_none());
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let raw = r#"{"content":"hi","role":"user","created_at":"yesterday"}"#;
        assert!(serde_json::from_str::<StoredMessage>(raw).is_err());
    }
}
