//! Active WebSocket session registry.
//!
//! Sessions are keyed `{user_id}_{agent_id}`; a reconnect under the same key
//! replaces the previous sender, and only the current sender can unregister.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};

use crate::ws_protocol::ServerMessage;

pub type SessionId = String;
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

pub fn session_key(user_id: &str, agent_id: &str) -> SessionId {
    format!("{user_id}_{agent_id}")
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, ClientSender>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: SessionId, sender: ClientSender) {
        let mut w = self.sessions.write().await;
        w.insert(session_id, sender);
    }

    /// Remove `session_id` if it still belongs to `sender`. Returns false when
    /// a newer connection has taken the key over.
    pub async fn unregister(&self, session_id: &str, sender: &ClientSender) -> bool {
        let mut w = self.sessions.write().await;
        match w.get(session_id) {
            Some(current) if current.same_channel(sender) => {
                w.remove(session_id);
                true
            }
            _ => false,
        }
    }

    /// Returns false when the session is unknown or its socket is gone.
    pub async fn send_to(&self, session_id: &str, msg: ServerMessage) -> bool {
        let r = self.sessions.read().await;
        match r.get(session_id) {
            Some(sender) => sender.send(msg).is_ok(),
            None => false,
        }
    }

    pub async fn connected_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_send_unregister() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let key = session_key("u1", "math");
        assert_eq!(key, "u1_math");

        registry.register(key.clone(), tx.clone()).await;
        assert!(registry.send_to(&key, ServerMessage::status("hi")).await);
        assert!(matches!(rx.recv().await, Some(ServerMessage::Status { content }) if content == "hi"));

        assert!(registry.unregister(&key, &tx).await);
        assert_eq!(registry.connected_count().await, 0);
        assert!(!registry.send_to(&key, ServerMessage::status("gone")).await);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_sender() {
        let registry = SessionRegistry::new();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        registry.register("u1_math".into(), old_tx.clone()).await;
        registry.register("u1_math".into(), new_tx).await;

        assert_eq!(registry.connected_count().await, 1);
        assert!(registry.send_to("u1_math", ServerMessage::message("x")).await);
        assert!(new_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_stale_sender_cannot_unregister_newer_session() {
        let registry = SessionRegistry::new();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        registry.register("u1_math".into(), old_tx.clone()).await;
        registry.register("u1_math".into(), new_tx.clone()).await;

        assert!(!registry.unregister("u1_math", &old_tx).await);
        assert_eq!(registry.connected_count().await, 1);
        assert!(registry.send_to("u1_math", ServerMessage::message("still here")).await);
        assert!(new_rx.recv().await.is_some());

        assert!(registry.unregister("u1_math", &new_tx).await);
        assert_eq!(registry.connected_count().await, 0);
    }
}
