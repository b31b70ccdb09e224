//! WebSocket chat protocol.
//!
//! Frames are JSON objects tagged by `type`.

use serde::{Deserialize, Serialize};

/// Client -> Server.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Question {
        #[serde(default)]
        question: String,
        /// Defaults to the agent in the socket path.
        #[serde(default)]
        subject: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

/// Server -> Client.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Status { content: String },
    Message { content: String },
    Error { content: String },
}

impl ServerMessage {
    pub fn status(content: impl Into<String>) -> Self {
        Self::Status {
            content: content.into(),
        }
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_subject_is_optional() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"question","question":"ما هو التكامل؟"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Question {
                question: "ما هو التكامل؟".into(),
                subject: None
            }
        );
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Unsupported);
    }

    #[test]
    fn test_server_frames_are_type_tagged() {
        let json = serde_json::to_value(ServerMessage::status("جاري التفكير...")).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["content"], "جاري التفكير...");
    }
}
