use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::MemoryError;
use crate::types::{
    Conversation, NewConversation, NewMessage, NewStudySession, NewSubject, StoredMessage,
    StudySession, SubjectRecord,
};

pub type StoreResult<T> = Result<T, MemoryError>;

/// Table-level access to the tutoring records.
///
/// User ids are expected to be UUID-formatted already.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Backend name for logs.
    fn backend(&self) -> &str;

    /// Most recently updated conversation for the pair.
    async fn latest_conversation(
        &self,
        user_id: &str,
        teacher_id: &str,
    ) -> StoreResult<Option<Conversation>>;

    async fn insert_conversation(&self, row: NewConversation) -> StoreResult<Conversation>;

    /// Set `updated_at` on a conversation.
    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// All conversations of a user, newest first.
    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>>;

    async fn insert_message(&self, row: NewMessage) -> StoreResult<StoredMessage>;

    /// Oldest first, at most `limit`.
    async fn list_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<StoredMessage>>;

    async fn find_subject(&self, user_id: &str, name: &str) -> StoreResult<Option<SubjectRecord>>;

    async fn insert_subject(&self, row: NewSubject) -> StoreResult<SubjectRecord>;

    async fn list_subjects(&self, user_id: &str) -> StoreResult<Vec<SubjectRecord>>;

    async fn insert_study_session(&self, row: NewStudySession) -> StoreResult<StudySession>;

    async fn list_study_sessions(&self, user_id: &str) -> StoreResult<Vec<StudySession>>;
}

/// Messages kept by [`InMemoryStore`] before the oldest are dropped.
pub const DEFAULT_MESSAGE_CAP: usize = 10_000;

#[derive(Default)]
struct Tables {
    conversations: Vec<Conversation>,
    messages: VecDeque<StoredMessage>,
    subjects: Vec<SubjectRecord>,
    study_sessions: Vec<StudySession>,
}

/// Process-local store used when no database is configured.
///
/// Meant for development and single-process demos: nothing survives a
/// restart, and only the newest `message_cap` messages are kept.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
    message_cap: usize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            tables: RwLock::default(),
            offline: AtomicBool::new(false),
            message_cap: DEFAULT_MESSAGE_CAP,
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `cap` messages across all conversations. Zero is ignored.
    pub fn with_message_cap(mut self, cap: usize) -> Self {
        if cap > 0 {
            self.message_cap = cap;
        }
        self
    }

    /// Make every call fail with [`MemoryError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(MemoryError::Unavailable)
        } else {
            Ok(())
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn backend(&self) -> &str {
        "in-memory"
    }

    async fn latest_conversation(
        &self,
        user_id: &str,
        teacher_id: &str,
    ) -> StoreResult<Option<Conversation>> {
        self.check()?;
        let tables = self.tables.read().await;
        // Later inserts win ties on `updated_at`.
        Ok(tables
            .conversations
            .iter()
            .enumerate()
            .filter(|(_, c)| c.user_id == user_id && c.teacher_id == teacher_id)
            .max_by_key(|(i, c)| (c.updated_at, *i))
            .map(|(_, c)| c.clone()))
    }

    async fn insert_conversation(&self, row: NewConversation) -> StoreResult<Conversation> {
        self.check()?;
        let conversation = Conversation {
            id: new_id(),
            user_id: row.user_id,
            teacher_id: row.teacher_id,
            title: Some(row.title),
            updated_at: Some(Utc::now()),
        };
        self.tables
            .write()
            .await
            .conversations
            .push(conversation.clone());
        Ok(conversation)
    }

    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if let Some(conv) = tables.conversations.iter_mut().find(|c| c.id == id) {
            conv.updated_at = Some(at);
        }
        Ok(())
    }

    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<_> = tables
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn insert_message(&self, row: NewMessage) -> StoreResult<StoredMessage> {
        self.check()?;
        let message = StoredMessage {
            id: Some(new_id()),
            conversation_id: Some(row.conversation_id),
            content: row.content,
            role: row.role,
            created_at: Some(Utc::now()),
        };
        let mut tables = self.tables.write().await;
        tables.messages.push_back(message.clone());
        while tables.messages.len() > self.message_cap {
            if let Some(dropped) = tables.messages.pop_front() {
                debug!(conversation_id = ?dropped.conversation_id, "Dropped oldest in-memory message");
            }
        }
        Ok(message)
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<StoredMessage>> {
        self.check()?;
        let tables = self.tables.read().await;
        // Insertion order is creation order.
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.conversation_id.as_deref() == Some(conversation_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_subject(&self, user_id: &str, name: &str) -> StoreResult<Option<SubjectRecord>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .subjects
            .iter()
            .find(|s| s.user_id == user_id && s.name == name)
            .cloned())
    }

    async fn insert_subject(&self, row: NewSubject) -> StoreResult<SubjectRecord> {
        self.check()?;
        let subject = SubjectRecord {
            id: new_id(),
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            grade_level: None,
            difficulty_level: None,
            study_hours_target: None,
        };
        self.tables.write().await.subjects.push(subject.clone());
        Ok(subject)
    }

    async fn list_subjects(&self, user_id: &str) -> StoreResult<Vec<SubjectRecord>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .subjects
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_study_session(&self, row: NewStudySession) -> StoreResult<StudySession> {
        self.check()?;
        let session = StudySession {
            id: new_id(),
            user_id: row.user_id,
            subject_id: Some(row.subject_id),
            duration_minutes: Some(row.duration_minutes),
            topics_covered: Some(row.topics_covered),
            notes: None,
            score: None,
            session_date: Some(row.session_date),
        };
        self.tables
            .write()
            .await
            .study_sessions
            .push(session.clone());
        Ok(session)
    }

    async fn list_study_sessions(&self, user_id: &str) -> StoreResult<Vec<StudySession>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<_> = tables
            .study_sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.session_date.cmp(&a.session_date));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_conv(user: &str, teacher: &str) -> NewConversation {
        NewConversation {
            user_id: user.into(),
            teacher_id: teacher.into(),
            title: format!("Chat with {teacher}"),
        }
    }

    #[tokio::test]
    async fn test_latest_conversation_follows_updated_at() {
        let store = InMemoryStore::new();
        let first = store.insert_conversation(new_conv("u1", "math")).await.unwrap();
        let second = store.insert_conversation(new_conv("u1", "math")).await.unwrap();
        store.insert_conversation(new_conv("u1", "arabic")).await.unwrap();

        let latest = store.latest_conversation("u1", "math").await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);

        store
            .touch_conversation(&first.id, Utc::now() + Duration::seconds(60))
            .await
            .unwrap();
        let latest = store.latest_conversation("u1", "math").await.unwrap().unwrap();
        assert_eq!(latest.id, first.id);
    }

    #[tokio::test]
    async fn test_list_messages_respects_limit_and_order() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .insert_message(NewMessage {
                    conversation_id: "c1".into(),
                    content: format!("m{i}"),
                    role: "user".into(),
                })
                .await
                .unwrap();
        }
        let rows = store.list_messages("c1", 3).await.unwrap();
        let contents: Vec<_> = rows.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2"]);
        assert!(store.list_messages("other", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_cap_drops_oldest() {
        let store = InMemoryStore::new().with_message_cap(3);
        for i in 0..5 {
            store
                .insert_message(NewMessage {
                    conversation_id: "c1".into(),
                    content: format!("m{i}"),
                    role: "user".into(),
                })
                .await
                .unwrap();
        }
        let rows = store.list_messages("c1", 10).await.unwrap();
        let contents: Vec<_> = rows.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_offline_store_fails() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        let err = store.list_conversations("u1").await.unwrap_err();
        assert!(matches!(err, MemoryError::Unavailable));
    }
}
