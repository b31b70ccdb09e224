//! Supabase (PostgREST) backed store.
//!
//! Requests are built table-style: `from(table).select(..).eq(..).order(..)`
//! and sent to `<url>/rest/v1/<table>` with the project key in both the
//! `apikey` and `Authorization` headers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::MemoryError;
use crate::store::{MemoryStore, StoreResult};
use crate::types::{
    Conversation, NewConversation, NewMessage, NewStudySession, NewSubject, StoredMessage,
    StudySession, SubjectRecord,
};

pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    /// Start a request against `table`.
    pub fn from<'a>(&'a self, table: &'a str) -> TableRequest<'a> {
        TableRequest {
            store: self,
            table,
            params: Vec::new(),
        }
    }
}

/// A pending PostgREST request on one table.
pub struct TableRequest<'a> {
    store: &'a SupabaseStore,
    table: &'a str,
    params: Vec<(String, String)>,
}

impl<'a> TableRequest<'a> {
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.into()));
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.into(), format!("eq.{value}")));
        self
    }

    /// Equality on every pair.
    pub fn match_all(self, pairs: &[(&str, &str)]) -> Self {
        pairs.iter().fold(self, |req, (col, val)| req.eq(col, val))
    }

    pub fn order(mut self, column: &str, descending: bool) -> Self {
        let dir = if descending { "desc" } else { "asc" };
        self.params.push(("order".into(), format!("{column}.{dir}")));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".into(), n.to_string()));
        self
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.store.rest_url, self.table)
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// GET rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> StoreResult<Vec<T>> {
        let body = self.send(Method::GET, None::<&()>).await?;
        decode(self.table, &body)
    }

    /// POST one row and return it as stored.
    pub async fn insert<B: Serialize, T: DeserializeOwned>(self, row: &B) -> StoreResult<T> {
        let body = self.send(Method::POST, Some(row)).await?;
        let mut rows: Vec<T> = decode(self.table, &body)?;
        if rows.is_empty() {
            return Err(MemoryError::EmptyInsert(self.table.to_string()));
        }
        Ok(rows.swap_remove(0))
    }

    /// PATCH every row matched by the filters.
    pub async fn update<B: Serialize>(self, patch: &B) -> StoreResult<()> {
        self.send(Method::PATCH, Some(patch)).await?;
        Ok(())
    }

    async fn send<B: Serialize>(&self, method: Method, body: Option<&B>) -> StoreResult<String> {
        debug!(table = %self.table, method = %method, params = ?self.params, "PostgREST request");

        let mut request = self
            .store
            .client
            .request(method, self.url())
            .query(&self.params)
            .header("apikey", &self.store.api_key)
            .bearer_auth(&self.store.api_key);
        if let Some(body) = body {
            request = request
                .header("Prefer", "return=representation")
                .json(body);
        }

        let response = request.send().await.map_err(|source| MemoryError::Request {
            table: self.table.to_string(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| MemoryError::Request {
            table: self.table.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(MemoryError::Status {
                table: self.table.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(table: &str, body: &str) -> StoreResult<Vec<T>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|e| MemoryError::Decode {
        table: table.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl MemoryStore for SupabaseStore {
    fn backend(&self) -> &str {
        "supabase"
    }

    async fn latest_conversation(
        &self,
        user_id: &str,
        teacher_id: &str,
    ) -> StoreResult<Option<Conversation>> {
        let rows: Vec<Conversation> = self
            .from("conversations")
            .select("*")
            .match_all(&[("user_id", user_id), ("teacher_id", teacher_id)])
            .order("updated_at", true)
            .limit(1)
            .fetch()
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_conversation(&self, row: NewConversation) -> StoreResult<Conversation> {
        self.from("conversations").insert(&row).await
    }

    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.from("conversations")
            .eq("id", id)
            .update(&json!({ "updated_at": at.to_rfc3339() }))
            .await
    }

    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        self.from("conversations")
            .select("*")
            .eq("user_id", user_id)
            .order("updated_at", true)
            .fetch()
            .await
    }

    async fn insert_message(&self, row: NewMessage) -> StoreResult<StoredMessage> {
        self.from("messages").insert(&row).await
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<StoredMessage>> {
        self.from("messages")
            .select("id,conversation_id,content,role,created_at")
            .eq("conversation_id", conversation_id)
            .order("created_at", false)
            .limit(limit)
            .fetch()
            .await
    }

    async fn find_subject(&self, user_id: &str, name: &str) -> StoreResult<Option<SubjectRecord>> {
        let rows: Vec<SubjectRecord> = self
            .from("subjects")
            .select("*")
            .match_all(&[("user_id", user_id), ("name", name)])
            .limit(1)
            .fetch()
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_subject(&self, row: NewSubject) -> StoreResult<SubjectRecord> {
        self.from("subjects").insert(&row).await
    }

    async fn list_subjects(&self, user_id: &str) -> StoreResult<Vec<SubjectRecord>> {
        self.from("subjects")
            .select("*")
            .eq("user_id", user_id)
            .fetch()
            .await
    }

    async fn insert_study_session(&self, row: NewStudySession) -> StoreResult<StudySession> {
        self.from("study_sessions").insert(&row).await
    }

    async fn list_study_sessions(&self, user_id: &str) -> StoreResult<Vec<StudySession>> {
        self.from("study_sessions")
            .select("*")
            .eq("user_id", user_id)
            .order("session_date", true)
            .fetch()
            .await
    }
}
