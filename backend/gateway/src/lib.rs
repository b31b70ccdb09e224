//! Tawjihi Gateway
//!
//! HTTP API, homework uploads, and the per-tutor WebSocket chat.

pub mod api;
pub mod error;
pub mod home;
pub mod server;
pub mod session_registry;
pub mod uploads;
pub mod ws_protocol;
pub mod ws_server;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState};
pub use session_registry::SessionRegistry;
