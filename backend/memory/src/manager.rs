//! Catch-and-log facade over a [`MemoryStore`].
//!
//! Storage problems never reach the caller: they are logged and turned into
//! `None`, `false` or an empty list so a tutoring request can still be served.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use tawjihi_core::MessageRole;

use crate::error::MemoryError;
use crate::store::MemoryStore;
use crate::types::{
    Conversation, NewConversation, NewMessage, NewStudySession, NewSubject, StoredMessage,
    StudySession, SubjectRecord,
};
use crate::uuid_format::ensure_uuid_format;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Clone)]
pub struct TawjihiMemory {
    store: Arc<dyn MemoryStore>,
}

/// `"math"` -> `"Chat with Math Teacher"`.
fn default_title(teacher_id: &str) -> String {
    let mut chars = teacher_id.chars();
    let titled: String = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    };
    format!("Chat with {titled} Teacher")
}

impl TawjihiMemory {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        info!(backend = %store.backend(), "Conversation memory ready");
        Self { store }
    }

    pub fn backend(&self) -> &str {
        self.store.backend()
    }

    /// Latest conversation for the pair, or a new one.
    pub async fn get_or_create_conversation(
        &self,
        user_id: &str,
        teacher_id: &str,
        title: Option<&str>,
    ) -> Option<String> {
        let user_id = ensure_uuid_format(user_id);
        self.conversation_id(&user_id, teacher_id, title)
            .await
            .inspect_err(|e| error!(error = %e, teacher_id, "Error managing conversation"))
            .ok()
    }

    async fn conversation_id(
        &self,
        user_id: &str,
        teacher_id: &str,
        title: Option<&str>,
    ) -> Result<String, MemoryError> {
        if let Some(existing) = self.store.latest_conversation(user_id, teacher_id).await? {
            debug!(conversation_id = %existing.id, "Reusing conversation");
            return Ok(existing.id);
        }
        let created = self
            .store
            .insert_conversation(NewConversation {
                user_id: user_id.to_string(),
                teacher_id: teacher_id.to_string(),
                title: title
                    .map(str::to_string)
                    .unwrap_or_else(|| default_title(teacher_id)),
            })
            .await?;
        info!(conversation_id = %created.id, teacher_id, "Created conversation");
        Ok(created.id)
    }

    /// Store a message and bump the conversation's `updated_at`.
    pub async fn save_message(&self, conversation_id: &str, content: &str, role: MessageRole) -> bool {
        let result = self
            .store
            .insert_message(NewMessage {
                conversation_id: conversation_id.to_string(),
                content: content.to_string(),
                role: role.as_str().to_string(),
            })
            .await;
        let result = match result {
            Ok(_) => self.store.touch_conversation(conversation_id, Utc::now()).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, conversation_id, "Error saving message");
                false
            }
        }
    }

    /// Messages oldest first, at most `limit`.
    pub async fn get_conversation_history(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Vec<StoredMessage> {
        self.store
            .list_messages(conversation_id, limit)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, conversation_id, "Error getting conversation history");
                Vec::new()
            })
    }

    pub async fn list_conversations(&self, user_id: &str) -> Vec<Conversation> {
        self.try_list_conversations(user_id)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Error listing conversations");
                Vec::new()
            })
    }

    /// Like [`list_conversations`](Self::list_conversations) but surfaces the error.
    pub async fn try_list_conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<Conversation>, MemoryError> {
        self.store
            .list_conversations(&ensure_uuid_format(user_id))
            .await
    }

    pub async fn get_or_create_subject(&self, user_id: &str, name: &str) -> Option<String> {
        let user_id = ensure_uuid_format(user_id);
        self.subject_id(&user_id, name)
            .await
            .inspect_err(|e| error!(error = %e, subject = name, "Error resolving subject"))
            .ok()
    }

    async fn subject_id(&self, user_id: &str, name: &str) -> Result<String, MemoryError> {
        if let Some(subject) = self.store.find_subject(user_id, name).await? {
            return Ok(subject.id);
        }
        let created = self
            .store
            .insert_subject(NewSubject {
                user_id: user_id.to_string(),
                name: name.to_string(),
                description: None,
            })
            .await?;
        info!(subject_id = %created.id, subject = name, "Created subject");
        Ok(created.id)
    }

    /// Open a study session, creating the subject row if needed.
    pub async fn create_study_session(&self, user_id: &str, subject: &str) -> Option<String> {
        let user_id = ensure_uuid_format(user_id);
        self.open_study_session(&user_id, subject)
            .await
            .inspect_err(|e| error!(error = %e, subject, "Error creating study session"))
            .ok()
    }

    async fn open_study_session(&self, user_id: &str, subject: &str) -> Result<String, MemoryError> {
        let subject_id = self.subject_id(user_id, subject).await?;
        let session = self
            .store
            .insert_study_session(NewStudySession {
                user_id: user_id.to_string(),
                subject_id,
                duration_minutes: 0,
                topics_covered: Vec::new(),
                session_date: Utc::now(),
            })
            .await?;
        Ok(session.id)
    }

    pub async fn get_user_subjects(&self, user_id: &str) -> Vec<SubjectRecord> {
        self.store
            .list_subjects(&ensure_uuid_format(user_id))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Error getting user subjects");
                Vec::new()
            })
    }

    pub async fn get_user_study_sessions(&self, user_id: &str) -> Vec<StudySession> {
        self.store
            .list_study_sessions(&ensure_uuid_format(user_id))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Error getting study sessions");
                Vec::new()
            })
    }
}
