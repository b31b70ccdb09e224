//! WebSocket chat with one tutor.
//!
//! `/ws/:user_id/:agent_id` upgrades to a socket registered under
//! `{user_id}_{agent_id}`. Each question gets a "thinking" status frame and
//! then the tutor's answer.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tawjihi_logging::{EventLogger, TutorEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::server::GatewayState;
use crate::session_registry::{ClientSender, session_key};
use crate::ws_protocol::{ClientMessage, ServerMessage};

const THINKING: &str = "جاري التفكير...";
const EMPTY_QUESTION: &str = "يرجى إدخال السؤال";

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((user_id, agent_id)): Path<(String, String)>,
    State(state): State<GatewayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, user_id, agent_id))
}

async fn handle_connection(socket: WebSocket, state: GatewayState, user_id: String, agent_id: String) {
    let client_id = session_key(&user_id, &agent_id);
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let own_sender = tx.clone();
    state.sessions.register(client_id.clone(), tx.clone()).await;
    info!(client_id = %client_id, "WebSocket connected");
    state
        .sessions
        .send_to(&client_id, ServerMessage::status(format!("متصل مع {agent_id}")))
        .await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Dropping unserializable frame");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_client = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text(&text, &agent_id, &recv_client, &tx, &recv_state).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    if !state.sessions.unregister(&client_id, &own_sender).await {
        debug!(client_id = %client_id, "Session already taken over by a newer connection");
    }
    info!(client_id = %client_id, "WebSocket connection closed");
}

/// Handle one text frame. Bad frames produce an error frame; the socket
/// stays open.
async fn handle_text(
    text: &str,
    agent_id: &str,
    client_id: &str,
    reply_tx: &ClientSender,
    state: &GatewayState,
) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(client_id, error = %e, "Received invalid JSON message");
            EventLogger::log_event(
                client_id,
                TutorEvent::Error {
                    error_msg: format!("invalid frame: {e}"),
                },
            );
            let _ = reply_tx.send(ServerMessage::error(format!("Invalid message: {e}")));
            return;
        }
    };

    match msg {
        ClientMessage::Question { question, subject } => {
            if question.trim().is_empty() {
                let _ = reply_tx.send(ServerMessage::error(EMPTY_QUESTION));
                return;
            }
            let subject = subject
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| agent_id.to_string());

            let _ = reply_tx.send(ServerMessage::status(THINKING));
            EventLogger::log_event(
                client_id,
                TutorEvent::Question {
                    subject: subject.clone(),
                    content: question.clone(),
                },
            );

            let answer = state.tutors.ask(&subject, &question).await;

            EventLogger::log_event(
                client_id,
                TutorEvent::Answer {
                    subject,
                    content: answer.clone(),
                },
            );
            let _ = reply_tx.send(ServerMessage::message(answer));
        }
        ClientMessage::Unsupported => {
            debug!(client_id, "Ignoring unsupported message type");
        }
    }
}
