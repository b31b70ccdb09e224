pub mod error;
pub mod traits;
pub mod types;

pub use error::TawjihiError;
pub use traits::{LlmProvider, LlmRequest, LlmResponse};
pub use types::{AgentInfo, MessageRole, Subject, UnknownSubject};
